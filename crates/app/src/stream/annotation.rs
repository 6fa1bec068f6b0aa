//! Hand skeleton overlay and info bar drawn onto the outgoing frame.

use anyhow::{anyhow, Result};
use hand_core::{
    landmarks::{HAND_CONNECTIONS, LANDMARK_COUNT},
    HandLandmarks,
};
use image::{ImageBuffer, Rgb};
use video_io::Frame;

const CONNECTION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LANDMARK_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BAR_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const BAR_TEXT: Rgb<u8> = Rgb([255, 255, 255]);

type Canvas = ImageBuffer<Rgb<u8>, Vec<u8>>;

pub(crate) fn bgr_to_rgb(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len());
    for chunk in input.chunks_exact(3) {
        output.push(chunk[2]);
        output.push(chunk[1]);
        output.push(chunk[0]);
    }
    output
}

fn rgb_to_bgr(input: &[u8]) -> Vec<u8> {
    // Same channel swap in the other direction.
    bgr_to_rgb(input)
}

/// Draw every detected hand plus the info bar onto the RGB working buffer
/// and return the result as BGR bytes ready for the encoder sink.
pub(crate) fn annotate_frame(
    frame: &Frame,
    rgb: Vec<u8>,
    hands: &[HandLandmarks],
    count: u8,
    frame_number: u64,
    fps: f32,
) -> Result<Vec<u8>> {
    let width = frame.width as u32;
    let height = frame.height as u32;
    let mut image = Canvas::from_vec(width, height, rgb)
        .ok_or_else(|| anyhow!("frame buffer does not match {width}x{height}"))?;

    for hand in hands {
        draw_hand(&mut image, hand);
    }

    let info = format!("FINGERS {count}  FRAME {frame_number:06}  FPS {fps:4.1}");
    let info_width = (info.chars().count() as i32 * 6).min(width as i32);
    let info_x = (width as i32 - info_width - 4).max(0);
    let info_y = (height as i32 - 12).max(0);
    fill_rect(
        &mut image,
        info_x,
        info_y,
        info_x + info_width + 4,
        info_y + 8,
        BAR_BACKGROUND,
    );
    draw_label(&mut image, info_x + 2, info_y, &info, BAR_TEXT);

    Ok(rgb_to_bgr(image.as_raw()))
}

fn draw_hand(image: &mut Canvas, hand: &HandLandmarks) {
    let width = image.width() as f32;
    let height = image.height() as f32;

    let mut points = [(0i32, 0i32); LANDMARK_COUNT];
    for (point, lm) in points.iter_mut().zip(hand.landmarks.iter()) {
        *point = (
            (lm.x * width).round() as i32,
            (lm.y * height).round() as i32,
        );
    }

    for (from, to) in HAND_CONNECTIONS {
        draw_line(image, points[from], points[to], CONNECTION_COLOR);
    }
    for point in points {
        draw_dot(image, point.0, point.1, LANDMARK_COLOR);
    }
}

fn put_pixel(image: &mut Canvas, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < image.width() as i32 && y < image.height() as i32 {
        *image.get_pixel_mut(x as u32, y as u32) = color;
    }
}

fn draw_line(image: &mut Canvas, from: (i32, i32), to: (i32, i32), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let (x1, y1) = to;
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put_pixel(image, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += sx;
        }
        if doubled <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_dot(image: &mut Canvas, cx: i32, cy: i32, color: Rgb<u8>) {
    fill_rect(image, cx - 1, cy - 1, cx + 1, cy + 1, color);
}

fn fill_rect(image: &mut Canvas, left: i32, top: i32, right: i32, bottom: i32, color: Rgb<u8>) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let left = left.clamp(0, width.saturating_sub(1));
    let right = right.clamp(0, width.saturating_sub(1));
    let top = top.clamp(0, height.saturating_sub(1));
    let bottom = bottom.clamp(0, height.saturating_sub(1));

    for y in top..=bottom {
        for x in left..=right {
            *image.get_pixel_mut(x as u32, y as u32) = color;
        }
    }
}

fn draw_label(image: &mut Canvas, mut x: i32, y: i32, text: &str, color: Rgb<u8>) {
    let height = image.height() as i32;
    let baseline = y;
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                let py = baseline + row as i32;
                if py < 0 || py >= height {
                    continue;
                }
                for col in 0..5 {
                    if (pattern >> (4 - col)) & 1 == 1 {
                        put_pixel(image, x + col, py, color);
                    }
                }
            }
        }
        x += 6;
    }
}

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    match ch {
        'A' => Some([
            0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001,
        ]),
        'E' => Some([
            0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111,
        ]),
        'F' => Some([
            0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000,
        ]),
        'G' => Some([
            0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110,
        ]),
        'I' => Some([
            0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        'M' => Some([
            0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001,
        ]),
        'N' => Some([
            0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001,
        ]),
        'P' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000,
        ]),
        'R' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001,
        ]),
        'S' => Some([
            0b01111, 0b10000, 0b01110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        '0' => Some([
            0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110,
        ]),
        '1' => Some([
            0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        '2' => Some([
            0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111,
        ]),
        '3' => Some([
            0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110,
        ]),
        '4' => Some([
            0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010,
        ]),
        '5' => Some([
            0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        '6' => Some([
            0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110,
        ]),
        '7' => Some([
            0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000,
        ]),
        '8' => Some([
            0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110,
        ]),
        '9' => Some([
            0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100,
        ]),
        '.' => Some([0, 0, 0, 0, 0, 0b00110, 0b00110]),
        ' ' => Some([0, 0, 0, 0, 0, 0, 0]),
        _ => None,
    }
}
