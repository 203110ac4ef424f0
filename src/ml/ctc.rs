// ============================================================
// Layer 5 - CTC Alignment Loss
// ============================================================
// Negative log-likelihood of a label sequence summed over every
// monotonic alignment of the network's T output steps, computed
// with the forward (alpha) recursion in log space.
//
// Extended label l' for a target of length L (blank written as -):
//
//   target   k  k  x            L = 3
//   l'       -  k  -  k  -  x  -        S = 2L + 1
//
//   alpha_t(s) = lse( alpha_{t-1}(s),
//                     alpha_{t-1}(s-1),
//                     alpha_{t-1}(s-2)   only if l'(s) != -  and
//                                          l'(s) != l'(s-2) )
//                + log y_t(l'(s))
//
//   -log p(l | x) = -lse( alpha_{T-1}(2L), alpha_{T-1}(2L-1) )
//
// Every step is a whole-batch tensor op, so the result is
// differentiable through burn's autodiff backend.
//
// Layout is batch-major [N, T, C] (what the CRNN produces).
// Labels are padded rows of [N, L_max] plus an explicit length per
// row. Positions past the length are ignored no matter what value
// they hold, so padding with the genuine symbol 0 is harmless.
//
// Unreachable states hold a large finite negative number instead of
// -inf. That keeps exp/log free of NaN without per-op masking; a
// loss above INFEASIBLE_LOSS means no alignment exists (the label
// needs more steps than T).
//
// Reference: Graves et al. (2006) Connectionist Temporal Classification
//            burn-nn CTCLoss

use burn::{prelude::*, tensor::activation::log_softmax};

/// Log-probability of an unreachable state
const NEG: f32 = -1.0e30;

/// Losses above this come from labels with no valid alignment
pub const INFEASIBLE_LOSS: f32 = 1.0e29;

#[derive(Config, Debug)]
pub struct CtcLossConfig {
    /// Index of the blank class in the network output
    pub blank: usize,
    /// Replace the loss of infeasible samples (and its gradient) with 0
    #[config(default = true)]
    pub zero_infinity: bool,
}

impl CtcLossConfig {
    pub fn init(&self) -> CtcLoss {
        CtcLoss {
            blank:         self.blank,
            zero_infinity: self.zero_infinity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CtcLoss {
    blank:         usize,
    zero_infinity: bool,
}

impl CtcLoss {
    /// Per-sample negative log-likelihood.
    ///
    /// - `log_probs`: `[N, T, C]` log-probabilities (log_softmax over C)
    /// - `targets`: `[N, L]` label indices, any value past the length
    /// - `target_lengths`: `[N]` genuine label lengths, each ≤ L
    ///
    /// Returns `[N]`. Infeasible samples give 0 when `zero_infinity`
    /// is set and a value above [`INFEASIBLE_LOSS`] otherwise.
    pub fn forward<B: Backend>(
        &self,
        log_probs:      Tensor<B, 3>,
        targets:        Tensor<B, 2, Int>,
        target_lengths: Tensor<B, 1, Int>,
    ) -> Tensor<B, 1> {
        let device            = log_probs.device();
        let [batch, steps, _] = log_probs.dims();

        let lengths  = target_lengths.reshape([batch, 1]);
        let extended = self.extended_labels(targets, lengths.clone(), &device);
        let ext_len  = extended.dims()[1];
        let skip     = self.skip_mask(extended.clone(), &device);

        // Log-probability of l'(s) at every step - [N, T, S]
        let index     = extended.reshape([batch, 1, ext_len]).expand([batch, steps, ext_len]);
        let emissions = log_probs.gather(2, index);

        // ── t = 0: only the leading blank and the first symbol ────────────────
        let emit_0 = emissions.clone().slice([0..batch, 0..1, 0..ext_len]).reshape([batch, ext_len]);
        let starts = positions::<B>(batch, ext_len, &device).lower_elem(2);
        let mut alpha = Tensor::<B, 2>::full([batch, ext_len], NEG, &device).mask_where(starts, emit_0);

        // ── t ≥ 1 ─────────────────────────────────────────────────────────────
        let unreachable = Tensor::<B, 2>::full([batch, ext_len], NEG, &device);
        for t in 1..steps {
            let stay = alpha.clone();
            let next = shift_right(alpha.clone(), 1, &device);
            let jump = unreachable.clone().mask_where(skip.clone(), shift_right(alpha, 2, &device));

            let emit = emissions
                .clone()
                .slice([0..batch, t..t + 1, 0..ext_len])
                .reshape([batch, ext_len]);

            alpha = log_sum_exp(vec![stay, next, jump]) + emit;
        }

        // ── End in the trailing blank or the last symbol ──────────────────────
        let end_blank  = lengths.clone().mul_scalar(2);
        let end_symbol = end_blank.clone().sub_scalar(1).clamp_min(0);
        let no_symbol  = lengths.equal_elem(0);

        let via_blank  = alpha.clone().gather(1, end_blank);
        let via_symbol = alpha.gather(1, end_symbol).mask_fill(no_symbol, NEG);

        let nll = log_sum_exp(vec![via_blank, via_symbol]).neg().reshape([batch]);

        if self.zero_infinity {
            let infeasible = nll.clone().greater_elem(INFEASIBLE_LOSS);
            nll.mask_fill(infeasible, 0.0)
        } else {
            nll
        }
    }

    /// Training objective: each loss divided by its label length
    /// (at least 1), averaged over the batch. Shape `[1]`.
    pub fn forward_mean<B: Backend>(
        &self,
        log_probs:      Tensor<B, 3>,
        targets:        Tensor<B, 2, Int>,
        target_lengths: Tensor<B, 1, Int>,
    ) -> Tensor<B, 1> {
        let per_sample = self.forward(log_probs, targets, target_lengths.clone());
        let divisor    = target_lengths.float().clamp_min(1.0);
        (per_sample / divisor).mean()
    }

    /// Convenience for raw network logits `[N, T, C]`
    pub fn forward_logits<B: Backend>(
        &self,
        logits:         Tensor<B, 3>,
        targets:        Tensor<B, 2, Int>,
        target_lengths: Tensor<B, 1, Int>,
    ) -> Tensor<B, 1> {
        self.forward_mean(log_softmax(logits, 2), targets, target_lengths)
    }

    /// Build l' = [-, y1, -, y2, ..., -, yL, -] padded with blanks to
    /// 2 * L_max + 1. Target positions past the genuine length are
    /// overwritten with blank first.
    fn extended_labels<B: Backend>(
        &self,
        targets: Tensor<B, 2, Int>,
        lengths: Tensor<B, 2, Int>,
        device:  &B::Device,
    ) -> Tensor<B, 2, Int> {
        let [batch, max_len] = targets.dims();
        let blank            = self.blank as i64;

        let (targets, max_len) = if max_len == 0 {
            (Tensor::<B, 2, Int>::full([batch, 1], blank, device), 1)
        } else {
            let past_end = positions::<B>(batch, max_len, device)
                .greater_equal(lengths.expand([batch, max_len]));
            (targets.mask_fill(past_end, blank), max_len)
        };

        let blanks      = Tensor::<B, 2, Int>::full([batch, max_len], blank, device);
        let interleaved = Tensor::stack::<3>(vec![blanks, targets], 2).reshape([batch, 2 * max_len]);
        let trailing    = Tensor::<B, 2, Int>::full([batch, 1], blank, device);

        Tensor::cat(vec![interleaved, trailing], 1)
    }

    /// True where alpha may jump from s-2: l'(s) is a symbol that
    /// differs from l'(s-2).
    fn skip_mask<B: Backend>(&self, extended: Tensor<B, 2, Int>, device: &B::Device) -> Tensor<B, 2, Bool> {
        let [batch, ext_len] = extended.dims();
        let blank            = self.blank as i64;

        let two_back = Tensor::cat(
            vec![
                Tensor::<B, 2, Int>::full([batch, 2], blank, device),
                extended.clone().slice([0..batch, 0..ext_len - 2]),
            ],
            1,
        );

        let is_symbol = extended.clone().not_equal_elem(blank).int();
        let differs   = extended.not_equal(two_back).int();
        (is_symbol * differs).equal_elem(1)
    }
}

/// Column index of every cell - [rows, cols]
fn positions<B: Backend>(rows: usize, cols: usize, device: &B::Device) -> Tensor<B, 2, Int> {
    Tensor::<B, 1, Int>::arange(0..cols as i64, device)
        .reshape([1, cols])
        .expand([rows, cols])
}

/// alpha(s - by) aligned at s, unreachable at the left edge
fn shift_right<B: Backend>(x: Tensor<B, 2>, by: usize, device: &B::Device) -> Tensor<B, 2> {
    let [rows, cols] = x.dims();
    Tensor::cat(
        vec![
            Tensor::full([rows, by], NEG, device),
            x.slice([0..rows, 0..cols - by]),
        ],
        1,
    )
}

/// Element-wise log(sum(exp(x_i))) of equally shaped tensors
fn log_sum_exp<B: Backend>(terms: Vec<Tensor<B, 2>>) -> Tensor<B, 2> {
    let [rows, cols] = terms[0].dims();
    let stacked      = Tensor::stack::<3>(terms, 2);
    let max          = stacked.clone().max_dim(2).detach();

    (stacked - max.clone())
        .exp()
        .sum_dim(2)
        .log()
        .add(max)
        .reshape([rows, cols])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;
    type TestAutodiffBackend = Autodiff<NdArray>;

    fn uniform(batch: usize, steps: usize, classes: usize) -> Tensor<TestBackend, 3> {
        let device = Default::default();
        Tensor::full([batch, steps, classes], -(classes as f32).ln(), &device)
    }

    fn labels(rows: &[&[i32]], width: usize) -> (Tensor<TestBackend, 2, Int>, Tensor<TestBackend, 1, Int>) {
        let device = Default::default();
        let flat: Vec<i32> = rows
            .iter()
            .flat_map(|r| r.iter().copied().chain(std::iter::repeat(0)).take(width))
            .collect();
        let lens: Vec<i32> = rows.iter().map(|r| r.len() as i32).collect();
        (
            Tensor::<TestBackend, 1, Int>::from_ints(flat.as_slice(), &device).reshape([rows.len(), width]),
            Tensor::<TestBackend, 1, Int>::from_ints(lens.as_slice(), &device),
        )
    }

    fn values(t: Tensor<TestBackend, 1>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!((actual - expected).abs() < 1e-4, "expected {expected}, got {actual}");
    }

    #[test]
    fn test_single_step_single_symbol() {
        let loss          = CtcLossConfig::new(1).init();
        let (tgt, lens)   = labels(&[&[0]], 1);
        let nll           = values(loss.forward(uniform(1, 1, 2), tgt, lens));
        assert_close(nll[0], 2f32.ln());
    }

    #[test]
    fn test_two_steps_sum_three_paths() {
        // 0 0, 0 -, - 0
        let loss        = CtcLossConfig::new(1).init();
        let (tgt, lens) = labels(&[&[0]], 1);
        let nll         = values(loss.forward(uniform(1, 2, 2), tgt, lens));
        assert_close(nll[0], -(0.75f32).ln());
    }

    #[test]
    fn test_exact_fit_has_one_path() {
        let loss        = CtcLossConfig::new(2).init();
        let (tgt, lens) = labels(&[&[0, 1]], 2);
        let nll         = values(loss.forward(uniform(1, 2, 3), tgt, lens));
        assert_close(nll[0], 2.0 * 3f32.ln());
    }

    #[test]
    fn test_empty_label_is_all_blank() {
        let loss        = CtcLossConfig::new(1).init();
        let (tgt, lens) = labels(&[&[]], 2);
        let nll         = values(loss.forward(uniform(1, 2, 2), tgt, lens));
        assert_close(nll[0], 4f32.ln());
    }

    #[test]
    fn test_padding_with_symbol_zero_is_ignored() {
        // Row 2 is [1, 0] with length 1: the trailing 0 is padding.
        let loss        = CtcLossConfig::new(2).init();
        let (tgt, lens) = labels(&[&[0, 1], &[1]], 2);
        let nll         = values(loss.forward(uniform(2, 2, 3), tgt, lens));
        assert_close(nll[0], 2.0 * 3f32.ln());
        assert_close(nll[1], 3f32.ln());
    }

    #[test]
    fn test_infeasible_label_is_zeroed() {
        // A repeated symbol needs a blank in between: 3 steps, only 2 given.
        let (tgt, lens) = labels(&[&[0, 0]], 2);
        let zeroed      = CtcLossConfig::new(1).init();
        assert_close(values(zeroed.forward(uniform(1, 2, 2), tgt.clone(), lens.clone()))[0], 0.0);

        let raw = CtcLossConfig::new(1).with_zero_infinity(false).init();
        assert!(values(raw.forward(uniform(1, 2, 2), tgt, lens))[0] > INFEASIBLE_LOSS);
    }

    #[test]
    fn test_mean_is_length_normalized() {
        let loss        = CtcLossConfig::new(2).init();
        let (tgt, lens) = labels(&[&[0, 1], &[1]], 2);
        let mean        = values(loss.forward_mean(uniform(2, 2, 3), tgt, lens));
        // (2 ln3 / 2 + ln3 / 1) / 2
        assert_close(mean[0], 3f32.ln());
    }

    #[test]
    fn test_gradients_are_finite_and_balanced() {
        let device = Default::default();
        let raw: Vec<f32> = (0..2 * 5 * 4).map(|i| ((i * 37 % 11) as f32 - 5.0) / 3.0).collect();
        let logits = Tensor::<TestAutodiffBackend, 1>::from_floats(raw.as_slice(), &device)
            .reshape([2, 5, 4])
            .require_grad();

        let targets = Tensor::<TestAutodiffBackend, 1, Int>::from_ints([0, 1, 1, 2, 0, 0], &device)
            .reshape([2, 3]);
        let lengths = Tensor::<TestAutodiffBackend, 1, Int>::from_ints([3, 1], &device);

        let loss  = CtcLossConfig::new(3).init().forward_logits(logits.clone(), targets, lengths);
        let grads = loss.backward();
        let grad  = logits.grad(&grads).unwrap();

        let values = grad.clone().into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|g| g.is_finite()));

        // Softmax gradients sum to zero over the class axis
        let per_step = grad.sum_dim(2).into_data().to_vec::<f32>().unwrap();
        assert!(per_step.iter().all(|s| s.abs() < 1e-4));
    }
}
