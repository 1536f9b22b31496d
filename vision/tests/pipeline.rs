use opencv::{
    core::{Mat, Point, Scalar, CV_8UC3, CV_8UC4},
    imgproc::{circle, FILLED, LINE_8},
    prelude::*,
};
use vision::{PipelineConfig, VisionSystem, STRAIGHT_AHEAD};

const YELLOW_BGRA: [f64; 4] = [40.0, 200.0, 255.0, 255.0];
const BLUE_BGRA: [f64; 4] = [255.0, 60.0, 0.0, 255.0];
// hue 130, saturation 80: inside both the blue and the reflection range
const GLARE_BGRA: [f64; 4] = [200.0, 137.0, 158.0, 255.0];

fn blank_frame() -> Mat {
    Mat::new_rows_cols_with_default(480, 640, CV_8UC4, Scalar::new(90.0, 90.0, 90.0, 255.0)).unwrap()
}

fn draw_cone(frame: &mut Mat, center: (i32, i32), color: [f64; 4]) {
    let color = Scalar::new(color[0], color[1], color[2], color[3]);
    circle(frame, Point::new(center.0, center.1), 12, color, FILLED, LINE_8, 0).unwrap();
}

fn vision_system() -> VisionSystem {
    VisionSystem::new(PipelineConfig::default()).unwrap()
}

#[test]
fn empty_frame_drives_straight() {
    let result = vision_system().process_frame(&blank_frame()).unwrap();

    assert!(result.yellow.is_empty());
    assert!(result.blue.is_empty());
    assert_eq!(result.heading.angle, STRAIGHT_AHEAD);
    assert_eq!(result.steering, 0.0);
}

#[test]
fn cones_above_the_crop_are_ignored() {
    let mut frame = blank_frame();
    draw_cone(&mut frame, (300, 60), YELLOW_BGRA);
    draw_cone(&mut frame, (300, 160), YELLOW_BGRA);

    let result = vision_system().process_frame(&frame).unwrap();
    assert!(result.yellow.is_empty());
    assert_eq!(result.steering, 0.0);
}

#[test]
fn straight_row_of_yellow_cones_keeps_the_wheel_centred() {
    let mut frame = blank_frame();
    draw_cone(&mut frame, (300, 300), YELLOW_BGRA);
    draw_cone(&mut frame, (300, 420), YELLOW_BGRA);

    let result = vision_system().process_frame(&frame).unwrap();

    assert_eq!(result.yellow.len(), 2);
    assert!(result.blue.is_empty());
    assert!(result.yellow[0].y > result.yellow[1].y, "nearest cone must come first");
    assert_eq!(result.heading.yellow_angle, Some(STRAIGHT_AHEAD));
    assert_eq!(result.steering, 0.0);
}

#[test]
fn both_colors_are_detected_separately() {
    let mut frame = blank_frame();
    draw_cone(&mut frame, (150, 300), YELLOW_BGRA);
    draw_cone(&mut frame, (150, 420), YELLOW_BGRA);
    draw_cone(&mut frame, (480, 300), BLUE_BGRA);

    let result = vision_system().process_frame(&frame).unwrap();

    assert_eq!(result.yellow.len(), 2);
    assert_eq!(result.blue.len(), 1);
    assert!(result.yellow.iter().all(|y| y.x < result.blue[0].x));
    assert_eq!(result.heading.blue_angle, None);
    assert!(result.heading.yellow_angle.is_some());
}

#[test]
fn glare_is_not_taken_for_blue_cones() {
    let mut frame = blank_frame();
    draw_cone(&mut frame, (200, 300), GLARE_BGRA);
    draw_cone(&mut frame, (400, 400), GLARE_BGRA);

    let result = vision_system().process_frame(&frame).unwrap();
    assert!(result.blue.is_empty());
    assert_eq!(result.steering, 0.0);
}

#[test]
fn bgr_frames_are_accepted() {
    let mut frame = Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(90.0)).unwrap();
    draw_cone(&mut frame, (300, 300), YELLOW_BGRA);
    draw_cone(&mut frame, (300, 420), YELLOW_BGRA);

    let result = vision_system().process_frame(&frame).unwrap();
    assert_eq!(result.yellow.len(), 2);
}

#[test]
fn annotated_view_has_configured_size() {
    let system = vision_system();
    let mut frame = blank_frame();
    draw_cone(&mut frame, (300, 420), BLUE_BGRA);

    let result = system.process_frame(&frame).unwrap();
    let view = system.birds_eye_view(&frame, &result).unwrap();
    assert_eq!((view.cols(), view.rows()), (640, 480));
}
