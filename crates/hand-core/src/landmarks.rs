//! Types for the 21-point hand landmark model.

/// Hand landmark indices (MediaPipe hand landmark model convention).
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// Number of landmarks per detected hand.
pub const LANDMARK_COUNT: usize = 21;

/// Skeleton topology of the landmark model, as (from, to) index pairs.
/// Used by the overlay to draw the hand the way the detection library does.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (index::WRIST, index::THUMB_CMC),
    (index::THUMB_CMC, index::THUMB_MCP),
    (index::THUMB_MCP, index::THUMB_IP),
    (index::THUMB_IP, index::THUMB_TIP),
    (index::WRIST, index::INDEX_FINGER_MCP),
    (index::INDEX_FINGER_MCP, index::INDEX_FINGER_PIP),
    (index::INDEX_FINGER_PIP, index::INDEX_FINGER_DIP),
    (index::INDEX_FINGER_DIP, index::INDEX_FINGER_TIP),
    (index::INDEX_FINGER_MCP, index::MIDDLE_FINGER_MCP),
    (index::MIDDLE_FINGER_MCP, index::MIDDLE_FINGER_PIP),
    (index::MIDDLE_FINGER_PIP, index::MIDDLE_FINGER_DIP),
    (index::MIDDLE_FINGER_DIP, index::MIDDLE_FINGER_TIP),
    (index::MIDDLE_FINGER_MCP, index::RING_FINGER_MCP),
    (index::RING_FINGER_MCP, index::RING_FINGER_PIP),
    (index::RING_FINGER_PIP, index::RING_FINGER_DIP),
    (index::RING_FINGER_DIP, index::RING_FINGER_TIP),
    (index::RING_FINGER_MCP, index::PINKY_MCP),
    (index::PINKY_MCP, index::PINKY_PIP),
    (index::PINKY_PIP, index::PINKY_DIP),
    (index::PINKY_DIP, index::PINKY_TIP),
    (index::WRIST, index::PINKY_MCP),
];

/// A single hand landmark, normalized to the image (x right, y down).
#[derive(Clone, Copy, Debug, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Depth relative to the wrist; carried through but unused by the counter.
    pub z: f32,
}

/// One detected hand: all 21 landmarks plus the model's metadata.
#[derive(Clone, Debug)]
pub struct HandLandmarks {
    pub landmarks: [Landmark; LANDMARK_COUNT],
    pub confidence: f32,
    pub handedness: String,
}
