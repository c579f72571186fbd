// ============================================================
// Layer 5 — Greedy Decoder
// ============================================================
// Autoregressive arg-max decoding, no sampling:
//
//   tgt = [<sos>]
//   repeat up to max_len times:
//       logits = model(src, tgt) at the last position
//       next   = argmax(logits)
//       tgt    = tgt ++ next
//       stop early once every row has produced <eos>
//
// `greedy_loop` owns the loop and the bookkeeping; callers
// supply one step that maps the current decoder input to
// last-position logits. Two steps exist:
//
//   live model  — encode once, then decode + project per step
//   graph run   — re-submit src and the whole tgt per step
//                 (see export/session.rs)
//
// Each returned row excludes <sos> and is cut right after its
// first <eos>. max_len is clamped to the target positional
// table, since the decoder input never grows past it.
//
// Reference: Vaswani et al. (2017) §6.1

use burn::prelude::*;

use crate::domain::error::SummarizerResult;
use crate::domain::vocabulary::Vocabulary;
use crate::ml::mask::causal_mask;
use crate::ml::model::Seq2Seq;

/// Run the greedy loop for `batch` rows.
///
/// `step` receives the decoder input [batch, len] and returns
/// logits [batch, vocab] for the last position.
pub fn greedy_loop<B, F>(
    batch:   usize,
    max_len: usize,
    sos_id:  u32,
    eos_id:  u32,
    device:  &B::Device,
    mut step: F,
) -> SummarizerResult<Vec<Vec<u32>>>
where
    B: Backend,
    F: FnMut(Tensor<B, 2, Int>) -> SummarizerResult<Tensor<B, 2>>,
{
    let mut tgt       = Tensor::<B, 2, Int>::full([batch, 1], sos_id as i64, device);
    let mut generated = vec![Vec::with_capacity(max_len); batch];
    let mut finished  = vec![false; batch];

    for _ in 0..max_len {
        let logits = step(tgt.clone())?;
        let next   = logits.argmax(1); // [batch, 1]

        let ids: Vec<i64> = next.clone().into_data().iter::<i64>().collect();
        for (row, &id) in ids.iter().enumerate() {
            if finished[row] {
                continue;
            }
            generated[row].push(id as u32);
            finished[row] = id as u32 == eos_id;
        }

        if finished.iter().all(|&done| done) {
            break;
        }
        tgt = Tensor::cat(vec![tgt, next], 1);
    }

    Ok(generated)
}

/// Greedy decode on the live model. src_ids: [batch, src_seq].
pub fn greedy_decode<B: Backend>(
    model:   &Seq2Seq<B>,
    src_ids: Tensor<B, 2, Int>,
    max_len: usize,
) -> SummarizerResult<Vec<Vec<u32>>> {
    let [batch, src_len] = src_ids.dims();
    model.check_lengths(src_len, 1)?;

    let max_len  = max_len.min(model.tgt_capacity());
    let device   = src_ids.device();
    let d_model  = model.d_model;
    let src_mask = model.source_mask(&src_ids);
    let memory   = model.encode(src_ids, src_mask.clone());

    greedy_loop(batch, max_len, Vocabulary::SOS_ID, Vocabulary::EOS_ID, &device, |tgt| {
        let len    = tgt.dims()[1];
        let hidden = model.decode(memory.clone(), src_mask.clone(), tgt, causal_mask(len, &device));
        let last   = hidden
            .slice([0..batch, len - 1..len, 0..d_model])
            .reshape([batch, d_model]);
        Ok(model.projection.forward(last))
    })
}
