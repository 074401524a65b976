use kurbo::Point;
use std::time::{Duration, Instant};
use studio_core::canvas::Canvas;
use studio_core::document::EditError;
use studio_core::input::{KeyEvent, MouseButton, PointerEvent};
use studio_core::shapes::Shape;
use studio_core::tools::ToolKind;

fn click(canvas: &mut Canvas, x: f64, y: f64, at: Instant) {
    let position = Point::new(x, y);
    canvas.handle_pointer(
        PointerEvent::Down {
            position,
            button: MouseButton::Left,
        },
        at,
    );
    canvas.handle_pointer(
        PointerEvent::Up {
            position,
            button: MouseButton::Left,
        },
        at,
    );
}

#[test]
fn three_points_then_double_click_make_one_path() {
    let mut canvas = Canvas::default();
    canvas.set_tool(ToolKind::Path);
    let t0 = Instant::now();
    click(&mut canvas, 10.0, 10.0, t0);
    click(&mut canvas, 50.0, 10.0, t0 + Duration::from_millis(500));
    click(&mut canvas, 50.0, 50.0, t0 + Duration::from_millis(1000));
    // Second half of the double-click on the last point.
    click(&mut canvas, 50.0, 50.0, t0 + Duration::from_millis(1150));

    assert_eq!(canvas.scene().len(), 1);
    let Some(Shape::Path(path)) = canvas.scene().iter().next() else {
        panic!("expected a path object");
    };
    assert_eq!(
        path.anchors(),
        vec![Point::new(10.0, 10.0), Point::new(50.0, 10.0), Point::new(50.0, 50.0)]
    );
    assert!(canvas.document.can_undo());
    assert!(canvas.overlay_shapes().is_empty());
    assert!(!canvas.path_tool.is_collecting());
}

#[test]
fn enter_finishes_the_path() {
    let mut canvas = Canvas::default();
    canvas.set_tool(ToolKind::Path);
    let t0 = Instant::now();
    click(&mut canvas, 0.0, 0.0, t0);
    click(&mut canvas, 100.0, 0.0, t0 + Duration::from_secs(1));
    canvas.handle_key(KeyEvent::Pressed("Enter".to_string()));
    assert_eq!(canvas.scene().len(), 1);
}

#[test]
fn finishing_after_a_single_point_is_a_no_op() {
    let mut canvas = Canvas::default();
    canvas.set_tool(ToolKind::Path);
    let t0 = Instant::now();
    click(&mut canvas, 10.0, 10.0, t0);
    // A double-click on the only point.
    click(&mut canvas, 10.0, 10.0, t0 + Duration::from_millis(100));

    assert!(canvas.scene().is_empty());
    assert!(!canvas.document.can_undo());
    assert_eq!(canvas.finish_path(), Err(EditError::TooFewPoints(1)));
    // Preview markers stay up so the user can keep going.
    assert!(!canvas.overlay_shapes().is_empty());
}

#[test]
fn preview_is_never_part_of_the_scene() {
    let mut canvas = Canvas::default();
    canvas.set_tool(ToolKind::Path);
    let t0 = Instant::now();
    click(&mut canvas, 10.0, 10.0, t0);
    click(&mut canvas, 60.0, 10.0, t0 + Duration::from_secs(1));

    assert!(canvas.scene().is_empty());
    assert!(canvas.overlay_shapes().iter().all(Shape::is_decorative));

    canvas.handle_key(KeyEvent::Pressed("Escape".to_string()));
    assert!(canvas.overlay_shapes().is_empty());
    assert!(canvas.scene().is_empty());
}
