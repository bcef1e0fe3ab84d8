//! Sampling annotator (component G). Grounded on `set_sampling_parameters`
//! in `smv/convolution.c`: first and last children at a level always
//! execute; the middle is chunked so that roughly `sampled` of them execute,
//! each one's `upscale` absorbing the consecutive skipped siblings it
//! statistically stands in for.

use crate::config::SamplingConfig;
use crate::primitives::tile::{ActivationPlan, Plan, Sampled, WeightPlan};
use crate::utils::calculation::div_ceil;

/// Applies sampling at one tile-tree level. `sampled == 0` means "execute
/// everything" (no sampling at this level); so does `sampled` being large
/// enough that there's nothing left to skip (`sampled >= n - 2`).
///
/// The middle children aren't visited in skip-ahead jumps: every middle
/// index is walked in turn, and a single `remaining` budget (seeded from the
/// total child count and drained by each visited child's `upscale`, which is
/// capped by the one `upscale_factor` chosen before the loop starts) decides
/// whether that index still gets to execute. This mirrors the source: the
/// chunk size is fixed up front, not recomputed from a shrinking count on
/// each iteration.
fn annotate_level<T: Sampled>(items: &mut [T], sampled: u32) {
    let n = items.len();
    if n == 0 {
        return;
    }
    let do_sampling = sampled > 0 && n > 2 && (sampled as usize) < n - 2;
    if !do_sampling {
        for item in items.iter_mut() {
            item.set_sampling(true, 1);
        }
        return;
    }

    let upscale_factor = div_ceil(n - 2, sampled as usize).max(1);

    items[0].set_sampling(true, 1);
    let mut remaining = n - 1;
    for item in items[1..n - 1].iter_mut() {
        if remaining > 1 {
            let upscale = upscale_factor.min(remaining - 1);
            item.set_sampling(true, upscale as u32);
            remaining -= upscale;
        } else {
            item.set_sampling(false, 0);
        }
    }
    items[n - 1].set_sampling(true, 1);
}

/// Annotates every level of whichever plan variant the cost gate chose.
pub fn annotate_plan(plan: &mut Plan, cfg: &SamplingConfig) {
    match plan {
        Plan::ActivationPriority(activation) => annotate_activation_plan(activation, cfg),
        Plan::WeightPriority(weight) => annotate_weight_plan(weight, cfg),
    }
}

fn annotate_activation_plan(plan: &mut ActivationPlan, cfg: &SamplingConfig) {
    annotate_level(&mut plan.l2_tiles, cfg.sampled_l2);
    for l2 in &mut plan.l2_tiles {
        annotate_level(&mut l2.input_tiles, cfg.sampled_input);
        for input_tile in &mut l2.input_tiles {
            annotate_level(&mut input_tile.output_tiles, cfg.sampled_output);
            for output_tile in &mut input_tile.output_tiles {
                annotate_level(&mut output_tile.hw_passes, cfg.sampled_hw_pass);
            }
        }
    }
}

fn annotate_weight_plan(plan: &mut WeightPlan, cfg: &SamplingConfig) {
    annotate_level(&mut plan.output_tiles, cfg.sampled_output);
    for output_tile in &mut plan.output_tiles {
        annotate_level(&mut output_tile.input_tiles, cfg.sampled_input);
        for input_tile in &mut output_tile.input_tiles {
            annotate_level(&mut input_tile.hw_passes, cfg.sampled_hw_pass);
        }
    }
}
