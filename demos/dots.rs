// dots.rs
use neugif::Encoder;
use pix::{Raster, rgb::SRgb8};
use std::error::Error;
use std::fs::File;

/// Render one filled circle into a full-color raster
fn render_circle(
    raster: &mut Raster<SRgb8>,
    cx: f32,
    cy: f32,
    r: f32,
    clr: SRgb8,
) {
    let x0 = (cx - r).floor().max(0.0) as i32;
    let x1 = (cx + r).ceil().min(raster.width() as f32) as i32;
    let y0 = (cy - r).floor().max(0.0) as i32;
    let y1 = (cy + r).ceil().min(raster.height() as f32) as i32;
    let rs = r.powi(2);
    for y in y0..y1 {
        let ys = (cy - y as f32 - 0.5).powi(2);
        for x in x0..x1 {
            let xs = (cx - x as f32 - 0.5).powi(2);
            if xs + ys <= rs {
                *raster.pixel_mut(x, y) = clr;
            }
        }
    }
}

fn page(blink: bool) -> Raster<SRgb8> {
    let amber = SRgb8::new(255, 208, 0);
    let red = SRgb8::new(255, 0, 0);
    let mut r = Raster::with_clear(32, 32);
    render_circle(&mut r, 12.0, 12.0, 3.0, amber);
    render_circle(&mut r, 20.0, 12.0, 3.0, amber);
    render_circle(&mut r, 12.0, 20.0, 3.0, amber);
    render_circle(&mut r, 20.0, 20.0, 3.0, amber);
    if blink {
        render_circle(&mut r, 16.0, 16.0, 3.5, red);
    }
    r
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let mut enc = Encoder::new();
    enc.set_delay_millis(2000);
    enc.set_loop_count(Some(0));
    enc.start(File::create("dots.gif")?)?;
    enc.add_frame(&page(true))?;
    enc.add_frame(&page(false))?;
    enc.finish()?;
    Ok(())
}
