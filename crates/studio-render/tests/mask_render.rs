use kurbo::{Point, Size, Vec2};
use studio_core::canvas::Canvas;
use studio_core::shapes::{Rectangle, SerializableColor, Shape, ShapeStyle};
use studio_render::{Pixmap, RasterRenderer, RenderContext, Renderer};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const RED: [u8; 4] = [255, 0, 0, 255];

fn canvas_with_photo() -> Canvas {
    let mut canvas = Canvas::default();
    let mut photo = Rectangle::new(Point::new(0.0, 0.0), 200.0, 100.0);
    photo.style = ShapeStyle::filled(SerializableColor::new(255, 0, 0, 255));
    let target = canvas.add_shape(Shape::Rectangle(photo));
    canvas.select(target);
    canvas
}

fn render(canvas: &Canvas) -> Pixmap {
    let ctx = RenderContext::new(canvas.scene(), Size::new(200.0, 100.0));
    RasterRenderer::new().render(&ctx).unwrap()
}

#[test]
fn test_committed_mask_clips_the_target() {
    let mut canvas = canvas_with_photo();
    assert_eq!(render(&canvas).pixel(10, 10), RED);

    canvas.start_mask().unwrap();
    // Overlay shrinks to (50, 25)-(150, 75).
    canvas.scale_selected(0.5, 0.5);
    canvas.commit_mask().unwrap();

    let pixmap = render(&canvas);
    assert_eq!(pixmap.pixel(100, 50), RED);
    assert_eq!(pixmap.pixel(60, 30), RED);
    for (x, y) in [(10, 10), (160, 50), (100, 10), (100, 90), (40, 50)] {
        assert_eq!(pixmap.pixel(x, y), WHITE, "pixel ({x}, {y}) outside the mask");
    }
}

#[test]
fn test_cancelled_mask_renders_identically() {
    let mut canvas = canvas_with_photo();
    let before = render(&canvas);

    canvas.start_mask().unwrap();
    canvas.scale_selected(0.5, 0.5);
    canvas.translate_selected(Vec2::new(20.0, 10.0));
    canvas.cancel_mask();

    assert_eq!(render(&canvas), before);
}
