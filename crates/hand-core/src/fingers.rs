//! Extended-finger counting over a landmark set.

use crate::landmarks::{index, HandLandmarks};

/// Fingertip landmarks checked against their PIP joints (tip index − 2).
const FINGERTIPS: [usize; 4] = [
    index::INDEX_FINGER_TIP,
    index::MIDDLE_FINGER_TIP,
    index::RING_FINGER_TIP,
    index::PINKY_TIP,
];

/// How counts from multiple detected hands collapse into the one integer
/// the notification channel carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandPolicy {
    /// The last hand in detection order wins.
    LastHand,
    /// The highest count across all hands wins.
    MaxCount,
}

impl HandPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "last" => Some(HandPolicy::LastHand),
            "max" => Some(HandPolicy::MaxCount),
            _ => None,
        }
    }

    pub fn flag_value(self) -> &'static str {
        match self {
            HandPolicy::LastHand => "last",
            HandPolicy::MaxCount => "max",
        }
    }
}

/// Count extended fingers on one hand; result in `0..=5`.
///
/// Thumb: tip past the index fingertip on the positive x axis. This is a
/// mirrored-image heuristic tied to one hand orientation, not
/// rotation-invariant. Other fingers: tip strictly above its PIP joint
/// (image y grows downward). Both comparisons are strict, so a tip exactly
/// level with its reference point does not count.
pub fn count_fingers(hand: &HandLandmarks) -> u8 {
    let lm = &hand.landmarks;
    let mut count = 0u8;

    if lm[index::THUMB_TIP].x > lm[index::INDEX_FINGER_TIP].x {
        count += 1;
    }
    for &tip in &FINGERTIPS {
        if lm[tip].y < lm[tip - 2].y {
            count += 1;
        }
    }

    count
}

/// Collapse per-hand counts according to `policy`; no hands is zero.
pub fn count_hands(hands: &[HandLandmarks], policy: HandPolicy) -> u8 {
    match policy {
        HandPolicy::LastHand => hands.last().map(count_fingers).unwrap_or(0),
        HandPolicy::MaxCount => hands.iter().map(count_fingers).max().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{Landmark, LANDMARK_COUNT};

    /// Build a hand with every finger folded, then raise the given tips.
    /// Folded pose: each tip sits below its PIP joint, thumb tip exactly
    /// level with the index tip (the tie case).
    fn hand_with(tips_up: &[usize], thumb_out: bool) -> HandLandmarks {
        let mut lm = [Landmark::default(); LANDMARK_COUNT];
        for &tip in &FINGERTIPS {
            lm[tip].y = 0.6;
            lm[tip - 2].y = 0.5;
        }
        lm[index::THUMB_TIP].x = 0.4;
        lm[index::INDEX_FINGER_TIP].x = 0.4;

        for &tip in tips_up {
            lm[tip].y = 0.3;
        }
        if thumb_out {
            lm[index::THUMB_TIP].x = 0.7;
        }

        HandLandmarks {
            landmarks: lm,
            confidence: 0.9,
            handedness: "Right".to_string(),
        }
    }

    #[test]
    fn open_hand_counts_five() {
        let hand = hand_with(&FINGERTIPS, true);
        assert_eq!(count_fingers(&hand), 5);
    }

    #[test]
    fn closed_fist_counts_zero() {
        let hand = hand_with(&[], false);
        assert_eq!(count_fingers(&hand), 0);
    }

    #[test]
    fn index_only_counts_one() {
        let hand = hand_with(&[index::INDEX_FINGER_TIP], false);
        assert_eq!(count_fingers(&hand), 1);
    }

    #[test]
    fn thumb_tie_is_not_extended() {
        // hand_with leaves thumb tip x equal to index tip x.
        let hand = hand_with(&FINGERTIPS, false);
        assert_eq!(count_fingers(&hand), 4);
    }

    #[test]
    fn fingertip_tie_is_not_extended() {
        let mut hand = hand_with(&[], false);
        let pip_y = hand.landmarks[index::INDEX_FINGER_PIP].y;
        hand.landmarks[index::INDEX_FINGER_TIP].y = pip_y;
        assert_eq!(count_fingers(&hand), 0);
    }

    #[test]
    fn counting_is_deterministic() {
        let hand = hand_with(&[index::INDEX_FINGER_TIP, index::PINKY_TIP], true);
        let first = count_fingers(&hand);
        assert_eq!(first, count_fingers(&hand));
        assert_eq!(first, 3);
    }

    #[test]
    fn last_hand_policy_keeps_final_count() {
        let hands = vec![hand_with(&FINGERTIPS, true), hand_with(&[], false)];
        assert_eq!(count_hands(&hands, HandPolicy::LastHand), 0);
    }

    #[test]
    fn max_policy_keeps_highest_count() {
        let hands = vec![hand_with(&FINGERTIPS, true), hand_with(&[], false)];
        assert_eq!(count_hands(&hands, HandPolicy::MaxCount), 5);
    }

    #[test]
    fn no_hands_counts_zero() {
        assert_eq!(count_hands(&[], HandPolicy::LastHand), 0);
        assert_eq!(count_hands(&[], HandPolicy::MaxCount), 0);
    }

    #[test]
    fn policy_flags_round_trip() {
        assert_eq!(HandPolicy::parse("last"), Some(HandPolicy::LastHand));
        assert_eq!(HandPolicy::parse("max"), Some(HandPolicy::MaxCount));
        assert_eq!(HandPolicy::parse("first"), None);
    }
}
