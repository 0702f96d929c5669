use crate::types::LogHeader;

/// Never look further ahead than this for the next logged iteration
const MAX_SKIPPED_FRAMES: u32 = 5000;

/// Determine if a main frame should exist for `frame_index` given the log sampling rate
pub fn should_have_frame(frame_index: u32, header: &LogHeader) -> bool {
    let frame_interval_i = header.frame_interval_i.max(1);
    let frame_interval_p_num = header.frame_interval_p_num;
    let frame_interval_p_denom = header.frame_interval_p_denom.max(1);

    let mod_i = frame_index % frame_interval_i;
    let sum = mod_i
        .wrapping_add(frame_interval_p_num)
        .wrapping_sub(1);

    sum % frame_interval_p_denom < frame_interval_p_num
}

/// Iterations the sampling rate skips after `last_iteration` before the next
/// logged one. Zero when no main frame has been accepted yet.
pub fn count_intentionally_skipped_frames(last_iteration: Option<u32>, header: &LogHeader) -> u32 {
    let Some(last_iteration) = last_iteration else {
        return 0;
    };

    let mut count = 0;
    let mut frame_index = last_iteration.wrapping_add(1);

    while count < MAX_SKIPPED_FRAMES && !should_have_frame(frame_index, header) {
        count += 1;
        frame_index = frame_index.wrapping_add(1);
    }

    count
}

/// Iterations strictly between `last_iteration` and `target_iteration` the
/// sampling rate skips
pub fn count_intentionally_skipped_frames_to(
    last_iteration: Option<u32>,
    target_iteration: u32,
    header: &LogHeader,
) -> u32 {
    let Some(last_iteration) = last_iteration else {
        return 0;
    };

    let first = last_iteration.saturating_add(1);
    let last = target_iteration.min(first.saturating_add(MAX_SKIPPED_FRAMES));

    (first..last)
        .filter(|&frame_index| !should_have_frame(frame_index, header))
        .count() as u32
}
