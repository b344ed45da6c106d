// ============================================================
// Layer 5 — Recurrent Attention Transliterator
// ============================================================
// Encoder:
//   source embedding → bidirectional GRU → LayerNorm(2d)
//   → Linear(2d → d) → tanh
//
// Decoder (both paths share these weights):
//   target embedding → GRU → LayerNorm
//   → multi-head attention over encoder states → LayerNorm
//   → concat[decoder state, attended] → GRU → LayerNorm
//   → Linear(d → |target vocab|)
//
// Two execution modes:
//   forward()  teacher-forced, batched, used for training/loss
//   generate() autoregressive, one example, greedy arg-max
//
// Both run every GRU through `recur`, one time step at a time with
// the previous output fed back as hidden state, so a prefix decoded
// step by step scores exactly like the same prefix teacher-forced.

use anyhow::Result;
use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        gru::{Gru, GruConfig},
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{log_softmax, tanh},
};

use crate::data::batcher::TranslitBatch;
use crate::domain::vocabulary::{EOS_INDEX, PAD_INDEX, SOS_INDEX};

/// Hard cap on autoregressive steps.
pub const MAX_GENERATION_STEPS: usize = 16;

/// Attention heads; `dim` must be a multiple of this.
pub const NUM_HEADS: usize = 4;

#[derive(Config, Debug)]
pub struct TranslitModelConfig {
    pub source_vocab_size: usize,
    pub target_vocab_size: usize,
    pub dim:               usize,
    #[config(default = 4)]
    pub num_heads:         usize,
    #[config(default = 0.1)]
    pub attention_dropout: f64,
}

impl TranslitModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TranslitModel<B> {
        let d = self.dim;
        TranslitModel {
            source_embedding:  EmbeddingConfig::new(self.source_vocab_size, d).init(device),
            target_embedding:  EmbeddingConfig::new(self.target_vocab_size, d).init(device),
            encoder_forward:   GruConfig::new(d, d, true).init(device),
            encoder_backward:  GruConfig::new(d, d, true).init(device),
            encoder_norm:      LayerNormConfig::new(2 * d).init(device),
            encoder_fc:        LinearConfig::new(2 * d, d).init(device),
            pre_decoder:       GruConfig::new(d, d, true).init(device),
            pre_decoder_norm:  LayerNormConfig::new(d).init(device),
            attention:         MultiHeadAttentionConfig::new(d, self.num_heads)
                .with_dropout(self.attention_dropout)
                .init(device),
            attention_norm:    LayerNormConfig::new(d).init(device),
            post_decoder:      GruConfig::new(2 * d, d, true).init(device),
            post_decoder_norm: LayerNormConfig::new(d).init(device),
            output:            LinearConfig::new(d, self.target_vocab_size).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct TranslitModel<B: Backend> {
    pub source_embedding:  Embedding<B>,
    pub target_embedding:  Embedding<B>,
    pub encoder_forward:   Gru<B>,
    pub encoder_backward:  Gru<B>,
    pub encoder_norm:      LayerNorm<B>,
    pub encoder_fc:        Linear<B>,
    pub pre_decoder:       Gru<B>,
    pub pre_decoder_norm:  LayerNorm<B>,
    pub attention:         MultiHeadAttention<B>,
    pub attention_norm:    LayerNorm<B>,
    pub post_decoder:      Gru<B>,
    pub post_decoder_norm: LayerNorm<B>,
    pub output:            Linear<B>,
}

/// Encoder states plus which source positions are real.
pub struct EncoderOutput<B: Backend> {
    /// [batch, src_len, dim]
    pub states:     Tensor<B, 3>,
    /// [batch, src_len], true = real symbol, false = padding
    pub valid_mask: Tensor<B, 2, Bool>,
}

/// Result of one autoregressive decode.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Always starts with `<sos>`; ends with `<eos>` only if `finished`.
    pub indices:  Vec<usize>,
    pub finished: bool,
}

/// Hidden states carried between single decoder steps.
#[derive(Debug, Clone)]
pub struct DecoderHidden<B: Backend> {
    pre:  Option<Tensor<B, 2>>,
    post: Option<Tensor<B, 2>>,
}

impl<B: Backend> Default for DecoderHidden<B> {
    fn default() -> Self {
        Self { pre: None, post: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Start,
    Generating,
    Done,
}

impl<B: Backend> TranslitModel<B> {
    fn encode_states(&self, sources: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let embedded = self.source_embedding.forward(sources);

        // The backward direction reads the sequence right-to-left, then its
        // outputs are flipped back so both directions align per position.
        let (forward, _)  = recur(&self.encoder_forward, embedded.clone(), None);
        let (backward, _) = recur(&self.encoder_backward, embedded.flip([1]), None);
        let backward = backward.flip([1]);

        let x = Tensor::cat(vec![forward, backward], 2);
        let x = self.encoder_norm.forward(x);
        tanh(self.encoder_fc.forward(x))
    }

    /// sources: [batch, src_len] → one encoder vector per position.
    pub fn encode(&self, sources: Tensor<B, 2, Int>) -> EncoderOutput<B> {
        let valid_mask = sources.clone().equal_elem(PAD_INDEX as i32).bool_not();
        EncoderOutput { states: self.encode_states(sources), valid_mask }
    }

    /// Teacher-forced decoding.
    ///
    /// The target is fed without its final symbol, so position t predicts
    /// the symbol at t + 1. Attention ignores padded source positions.
    ///
    /// sources: [batch, src_len], targets: [batch, tgt_len],
    /// source_mask: [batch, src_len] (true = real)
    /// → logits [batch, tgt_len - 1, target_vocab]
    pub fn forward(
        &self,
        sources:     Tensor<B, 2, Int>,
        targets:     Tensor<B, 2, Int>,
        source_mask: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let [batch_size, tgt_len] = targets.dims();
        let encoded = self.encode_states(sources);

        let inputs  = targets.slice([0..batch_size, 0..tgt_len - 1]);
        let (decoded, _) = recur(&self.pre_decoder, self.target_embedding.forward(inputs), None);
        let decoded = self.pre_decoder_norm.forward(decoded);

        let attended = self
            .attention
            .forward(
                MhaInput::new(decoded.clone(), encoded.clone(), encoded)
                    .mask_pad(source_mask.bool_not()),
            )
            .context;
        let attended = self.attention_norm.forward(attended);

        let x = Tensor::cat(vec![decoded, attended], 2);
        let (x, _) = recur(&self.post_decoder, x, None);
        self.output.forward(self.post_decoder_norm.forward(x))
    }

    /// Forward pass plus masked cross-entropy against the shifted target.
    pub fn forward_loss(&self, batch: TranslitBatch<B>) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let [batch_size, tgt_len] = batch.targets.dims();
        let logits = self.forward(batch.sources, batch.targets.clone(), batch.source_mask);
        let next   = batch.targets.slice([0..batch_size, 1..tgt_len]);
        (masked_cross_entropy(logits.clone(), next), logits)
    }

    /// Greedy autoregressive decode of a single encoded source.
    ///
    /// State machine: Start → Generating → Done. On the transition out of
    /// Start the `<eos>` score is forced to -inf, so the first generated
    /// symbol is never the end marker. Decoding stops on `<eos>` or after
    /// `max_steps` steps; a truncated result is returned with
    /// `finished == false`.
    pub fn generate(
        &self,
        source:    &[usize],
        max_steps: usize,
        device:    &B::Device,
    ) -> Result<Generation> {
        let src: Vec<i32> = source.iter().map(|&x| x as i32).collect();
        let src = Tensor::<B, 1, Int>::from_ints(src.as_slice(), device).unsqueeze::<2>();
        let encoded = self.encode_states(src);

        let mut indices = vec![SOS_INDEX];
        let mut hidden  = DecoderHidden::default();
        let mut state = if max_steps == 0 { DecodeState::Done } else { DecodeState::Start };
        let mut steps = 0;

        while state != DecodeState::Done {
            let last = indices[indices.len() - 1];
            let mut scores: Vec<f32> = self
                .decode_step(last, &encoded, &mut hidden, device)
                .into_data()
                .convert::<f32>()
                .to_vec()
                .map_err(|e| anyhow::anyhow!("reading decoder scores: {e:?}"))?;

            if state == DecodeState::Start {
                scores[EOS_INDEX] = f32::NEG_INFINITY;
            }
            let next = argmax(&scores);
            indices.push(next);
            steps += 1;

            state = if next == EOS_INDEX || steps >= max_steps {
                DecodeState::Done
            } else {
                DecodeState::Generating
            };
        }

        let finished = indices.len() > 1 && indices[indices.len() - 1] == EOS_INDEX;
        Ok(Generation { indices, finished })
    }

    /// One decoder step for a single example: the previous symbol goes
    /// in, scores over the target vocabulary come out.
    ///
    /// encoded: [1, src_len, dim] from the encoder; `hidden` is advanced.
    pub fn decode_step(
        &self,
        token:   usize,
        encoded: &Tensor<B, 3>,
        hidden:  &mut DecoderHidden<B>,
        device:  &B::Device,
    ) -> Tensor<B, 1> {
        let token = Tensor::<B, 1, Int>::from_ints([token as i32].as_slice(), device).unsqueeze::<2>();

        let (decoded, pre) = recur(&self.pre_decoder, self.target_embedding.forward(token), hidden.pre.take());
        hidden.pre = Some(pre);
        let decoded = self.pre_decoder_norm.forward(decoded);

        let attended = self
            .attention
            .forward(MhaInput::new(decoded.clone(), encoded.clone(), encoded.clone()))
            .context;
        let attended = self.attention_norm.forward(attended);

        let x = Tensor::cat(vec![decoded, attended], 2);
        let (x, post) = recur(&self.post_decoder, x, hidden.post.take());
        hidden.post = Some(post);

        let logits = self.output.forward(self.post_decoder_norm.forward(x));
        let [_, _, vocab] = logits.dims();
        logits.reshape([vocab])
    }
}

/// Runs `gru` over the sequence one time step at a time, feeding each
/// step's output back in as the next step's hidden state.
///
/// input: [batch, len, d_in], state: [batch, d_hidden] (zeros if None)
/// → (outputs [batch, len, d_hidden], last state [batch, d_hidden])
///
/// `Gru::forward` reads the hidden state for step t from the state
/// tensor it is given rather than from step t - 1, so it is only
/// called here with sequences of length one.
fn recur<B: Backend>(
    gru:   &Gru<B>,
    input: Tensor<B, 3>,
    state: Option<Tensor<B, 2>>,
) -> (Tensor<B, 3>, Tensor<B, 2>) {
    let [batch_size, _, _] = input.dims();
    let d_hidden = gru.d_hidden;

    let mut hidden = state.unwrap_or_else(|| Tensor::zeros([batch_size, d_hidden], &input.device()));
    let mut outputs = Vec::new();

    for step in input.iter_dim(1) {
        let out = gru.forward(step, Some(hidden.reshape([batch_size, 1, d_hidden])));
        hidden = out.clone().reshape([batch_size, d_hidden]);
        outputs.push(out);
    }

    (Tensor::cat(outputs, 1), hidden)
}

/// Mean negative log-likelihood over non-padding targets.
///
/// logits: [batch, len, vocab], targets: [batch, len] → scalar [1].
/// Positions whose target is `<pad>` contribute neither to the sum nor
/// to the count, so they produce no gradient.
pub fn masked_cross_entropy<B: Backend>(logits: Tensor<B, 3>, targets: Tensor<B, 2, Int>) -> Tensor<B, 1> {
    let [batch_size, len, vocab] = logits.dims();
    let n = batch_size * len;

    let log_probs = log_softmax(logits.reshape([n, vocab]), 1);
    let targets   = targets.reshape([n]);
    let picked    = log_probs.gather(1, targets.clone().reshape([n, 1])).reshape([n]);

    let keep  = targets.equal_elem(PAD_INDEX as i32).bool_not().float();
    let total = (picked * keep.clone()).sum().neg();
    let count = keep.sum().clamp_min(1.0);
    total / count
}

/// Index of the first maximum. NaN never wins.
fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (i, &s) in scores.iter().enumerate() {
        if s > best_score {
            best = i;
            best_score = s;
        }
    }
    best
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    use crate::data::batcher::TranslitBatcher;
    use crate::data::dataset::TranslitSample;
    use crate::domain::vocabulary::Vocabulary;
    use burn::data::dataloader::batcher::Batcher;

    type TestBackend = NdArray;

    fn tiny_model<B: Backend>(device: &B::Device) -> TranslitModel<B> {
        TranslitModelConfig::new(Vocabulary::source().len(), Vocabulary::target().len(), 8)
            .init(device)
    }

    #[test]
    fn test_default_head_count() {
        assert_eq!(TranslitModelConfig::new(1, 1, 8).num_heads, NUM_HEADS);
    }

    #[test]
    fn test_argmax_first_max_wins() {
        assert_eq!(argmax(&[0.1, 0.5, 0.5, -1.0]), 1);
        assert_eq!(argmax(&[f32::NEG_INFINITY, 2.0]), 1);
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let model = tiny_model::<TestBackend>(&device);
        let batch = TranslitBatcher::<TestBackend>::new(device).batch(vec![
            TranslitSample { source: vec![1, 3, 4, 5, 2], target: vec![1, 10, 11, 2] },
            TranslitSample { source: vec![1, 3, 2],       target: vec![1, 12, 2] },
        ]);

        let logits = model.forward(batch.sources, batch.targets, batch.source_mask);
        assert_eq!(logits.dims(), [2, 3, Vocabulary::target().len()]);
    }

    #[test]
    fn test_encoder_mask_marks_padding() {
        let device = Default::default();
        let model = tiny_model::<TestBackend>(&device);
        let sources = Tensor::<TestBackend, 1, Int>::from_ints([1, 3, 2, 0].as_slice(), &device)
            .reshape([1, 4]);
        let out = model.encode(sources);
        assert_eq!(out.states.dims(), [1, 4, 8]);
        let mask: Vec<bool> = out.valid_mask.into_data().to_vec().unwrap();
        assert_eq!(mask, vec![true, true, true, false]);
    }

    #[test]
    fn test_masked_cross_entropy_ignores_padding() {
        let device = Default::default();
        // Position 0: uniform over 3 classes, target 1 → ln 3.
        // Position 1: target is <pad>; its logits must not matter.
        let logits = Tensor::<TestBackend, 1>::from_floats(
            [0.0, 0.0, 0.0, 10.0, 0.0, 0.0].as_slice(),
            &device,
        )
        .reshape([1, 2, 3]);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1, 0].as_slice(), &device)
            .reshape([1, 2]);

        let loss: f64 = masked_cross_entropy(logits, targets).into_scalar().elem();
        assert!((loss - 3f64.ln()).abs() < 1e-5, "loss = {loss}");
    }

    #[test]
    fn test_forward_loss_backpropagates() {
        type AD = Autodiff<TestBackend>;
        let device = Default::default();
        let model = tiny_model::<AD>(&device);
        let batch = TranslitBatcher::<AD>::new(device).batch(vec![
            TranslitSample { source: vec![1, 3, 4, 2], target: vec![1, 10, 11, 2] },
            TranslitSample { source: vec![1, 5, 2],    target: vec![1, 12, 2] },
        ]);

        let (loss, _) = model.forward_loss(batch);
        let value: f64 = loss.clone().into_scalar().elem();
        assert!(value.is_finite() && value > 0.0);
        let _grads = loss.backward();
    }

    #[test]
    fn test_generation_is_bounded_and_well_formed() {
        let device = Default::default();
        let model = tiny_model::<TestBackend>(&device);
        let source = Vocabulary::source().encode("kanalizer").unwrap();

        let generation = model.generate(&source, MAX_GENERATION_STEPS, &device).unwrap();
        assert_eq!(generation.indices[0], SOS_INDEX);
        assert!(generation.indices.len() >= 2);
        assert!(generation.indices.len() <= MAX_GENERATION_STEPS + 1);
        assert_ne!(generation.indices[1], EOS_INDEX);
        assert_eq!(
            generation.finished,
            generation.indices.last() == Some(&EOS_INDEX)
        );
        if !generation.finished {
            assert_eq!(generation.indices.len(), MAX_GENERATION_STEPS + 1);
        }
    }

    #[test]
    fn test_single_step_never_ends() {
        let device = Default::default();
        let model = tiny_model::<TestBackend>(&device);
        let source = Vocabulary::source().encode("a").unwrap();

        let generation = model.generate(&source, 1, &device).unwrap();
        assert_eq!(generation.indices.len(), 2);
        assert!(!generation.finished);

        let empty = model.generate(&source, 0, &device).unwrap();
        assert_eq!(empty.indices, vec![SOS_INDEX]);
    }

    fn floats<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec().unwrap()
    }

    fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
    }

    fn int_row(values: &[i32], device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(values, device).reshape([1, values.len()])
    }

    /// Output layer bias pinned so the listed symbols dominate every step.
    fn with_output_bias(mut model: TranslitModel<TestBackend>, favoured: &[(usize, f32)]) -> TranslitModel<TestBackend> {
        let device = Default::default();
        let mut bias = vec![0.0f32; Vocabulary::target().len()];
        for &(index, value) in favoured {
            bias[index] = value;
        }
        model.output.bias = Some(burn::module::Param::from_tensor(
            Tensor::<TestBackend, 1>::from_floats(bias.as_slice(), &device),
        ));
        model
    }

    #[test]
    fn test_encoder_state_depends_on_earlier_symbols() {
        let device = Default::default();
        let model = tiny_model::<TestBackend>(&device);
        let a = model.encode(int_row(&[1, 3, 4, 5, 2], &device)).states;
        let b = model.encode(int_row(&[1, 9, 4, 5, 2], &device)).states;

        // Only position 1 differs; position 2 must still see it
        let at_2 = |t: Tensor<TestBackend, 3>| floats(t.slice([0..1, 2..3, 0..8]));
        assert!(max_abs_diff(&at_2(a), &at_2(b)) > 1e-6);
    }

    #[test]
    fn test_decoder_logits_depend_on_earlier_targets() {
        let device = Default::default();
        let model = tiny_model::<TestBackend>(&device);
        let source = int_row(&[1, 3, 4, 2], &device);
        let mask = source.clone().equal_elem(PAD_INDEX as i32).bool_not();
        let vocab = Vocabulary::target().len();

        let a = model.forward(source.clone(), int_row(&[1, 10, 11, 12, 2], &device), mask.clone());
        let b = model.forward(source, int_row(&[1, 20, 11, 12, 2], &device), mask);

        // Inputs differ at position 1 only; positions 2 and 3 carry it forward
        for t in 2..4 {
            let at = |x: Tensor<TestBackend, 3>| floats(x.slice([0..1, t..t + 1, 0..vocab]));
            assert!(max_abs_diff(&at(a.clone()), &at(b.clone())) > 1e-6, "position {t}");
        }
    }

    #[test]
    fn test_teacher_forced_matches_step_decoding() {
        let device = Default::default();
        let model = tiny_model::<TestBackend>(&device);
        let source = int_row(&[1, 3, 4, 5, 2], &device);
        let target = [1usize, 10, 11, 12, 2];
        let vocab = Vocabulary::target().len();

        let mask = source.clone().equal_elem(PAD_INDEX as i32).bool_not();
        let target_row: Vec<i32> = target.iter().map(|&x| x as i32).collect();
        let batched = model.forward(source.clone(), int_row(&target_row, &device), mask);

        let encoded = model.encode(source).states;
        let mut hidden = DecoderHidden::default();
        for (t, &token) in target[..target.len() - 1].iter().enumerate() {
            let stepped = floats(model.decode_step(token, &encoded, &mut hidden, &device));
            let forced = floats(batched.clone().slice([0..1, t..t + 1, 0..vocab]));
            assert!(max_abs_diff(&stepped, &forced) < 1e-4, "position {t}");
        }
    }

    #[test]
    fn test_first_step_never_emits_eos() {
        let device = Default::default();
        let model = with_output_bias(tiny_model::<TestBackend>(&device), &[(EOS_INDEX, 1e4), (5, 1e3)]);
        let source = Vocabulary::source().encode("kana").unwrap();

        let generation = model.generate(&source, MAX_GENERATION_STEPS, &device).unwrap();
        assert_eq!(generation.indices, vec![SOS_INDEX, 5, EOS_INDEX]);
        assert!(generation.finished);
    }
}
