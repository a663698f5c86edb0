use crate::metrics::{SegmentBounds, SegmentStats, WindowPlan, WindowStats, EXPECTED_INTERVAL_MS};
use crate::slots::SlotIndex;
use chrono::{DateTime, TimeZone, Utc};

/// Where "now" and the start of logging sit on the slot timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotContext {
    pub now_slot: i64,
    /// None when the log has no records
    pub first_slot: Option<i64>,
}

pub fn analyze_segment(segment: &SegmentBounds, slots: &SlotIndex, ctx: SlotContext) -> SegmentStats {
    let Some(first_slot) = ctx.first_slot else {
        return empty_segment(segment);
    };

    let start_slot = segment.start_slot;
    let clamped_end = segment.end_slot.min(ctx.now_slot);
    let is_future = start_slot > ctx.now_slot;

    let available = if is_future {
        0
    } else {
        (clamped_end - start_slot + 1).max(0) as u64
    };

    // time before logging began is never counted against uptime
    let effective_start = start_slot.max(first_slot);
    let expected = if !is_future && clamped_end >= effective_start {
        (clamped_end - effective_start + 1) as u64
    } else {
        0
    };
    let observed = if expected > 0 {
        slots.count_in_range(effective_start, clamped_end)
    } else {
        0
    };

    let start_ms = segment.start_ms.max(0);
    let end_ms = segment
        .end_ms
        .min((clamped_end + 1) * EXPECTED_INTERVAL_MS)
        .max(start_ms);

    SegmentStats {
        key: segment.key.clone(),
        label: segment.label.clone(),
        start_slot,
        end_slot: segment.end_slot,
        start: instant(start_ms),
        end: instant(end_ms),
        available,
        expected,
        observed,
        missed: expected.saturating_sub(observed),
        uptime: percent(observed, expected),
        coverage: ratio(expected, available),
    }
}

/// Segment of a log with no records: nothing available, nothing expected.
fn empty_segment(segment: &SegmentBounds) -> SegmentStats {
    SegmentStats {
        key: segment.key.clone(),
        label: segment.label.clone(),
        start_slot: segment.start_slot,
        end_slot: segment.end_slot,
        start: instant(segment.start_ms),
        end: instant(segment.end_ms),
        available: 0,
        expected: 0,
        observed: 0,
        missed: 0,
        uptime: None,
        coverage: 0.0,
    }
}

pub fn analyze_window(plan: &WindowPlan, slots: &SlotIndex, ctx: SlotContext) -> WindowStats {
    let segments: Vec<SegmentStats> = plan
        .segments
        .iter()
        .map(|segment| analyze_segment(segment, slots, ctx))
        .collect();

    let observed: u64 = segments.iter().map(|s| s.observed).sum();
    let expected: u64 = segments.iter().map(|s| s.expected).sum();
    let available: u64 = segments.iter().map(|s| s.available).sum();

    WindowStats {
        key: plan.key.clone(),
        label: plan.label.clone(),
        segments,
        available,
        observed,
        expected,
        missed: expected.saturating_sub(observed),
        uptime: percent(observed, expected),
        coverage: ratio(expected, available),
    }
}

pub fn compute_window_stats(plans: &[WindowPlan], slots: &SlotIndex, ctx: SlotContext) -> Vec<WindowStats> {
    plans
        .iter()
        .map(|plan| analyze_window(plan, slots, ctx))
        .collect()
}

/// `part / whole * 100`, or None when nothing was expected.
pub fn percent(part: u64, whole: u64) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64 * 100.0)
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64
    } else {
        0.0
    }
}

fn instant(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}
