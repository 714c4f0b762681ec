// encode.rs
//
// Copyright (c) 2026  Douglas Lau
//
//! GIF animation encoder
use crate::block::*;
use crate::error::{Error, Result};
use crate::lzw::Compressor;
use crate::quant::Indexed;
use log::debug;
use pix::rgb::SRgb8;
use pix::Raster;
use std::io::{self, BufWriter, Write};

/// Initial LZW code size for a 256-entry palette
const MIN_CODE_SIZE: u8 = 8;

/// Quantizer sampling factor
const SAMPLE_FAC: usize = 10;

/// Encoder state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    NotStarted,
    Started,
    Finished,
}

/// Animated GIF encoder
///
/// Frames are full-color [Raster]s; each one is quantized to its own
/// 256-entry palette and compressed as it is added.  All frames must have
/// the same dimensions.
///
/// ## Example
/// ```
/// use neugif::Encoder;
/// use pix::{rgb::SRgb8, Raster};
///
/// # fn main() -> Result<(), neugif::Error> {
/// let mut gif = Vec::new();
/// let mut enc = Encoder::new();
/// enc.set_delay_millis(100);
/// enc.set_loop_count(Some(0));
/// enc.start(&mut gif)?;
/// for shade in [64u8, 192] {
///     let mut raster = Raster::<SRgb8>::with_clear(4, 4);
///     *raster.pixel_mut(1, 1) = SRgb8::new(shade, 32, 32);
///     enc.add_frame(&raster)?;
/// }
/// enc.finish()?;
/// drop(enc);
/// assert!(gif.starts_with(b"GIF89a"));
/// # Ok(())
/// # }
/// ```
///
/// [Raster]: https://docs.rs/pix/latest/pix/struct.Raster.html
pub struct Encoder<W: Write> {
    /// Writer for output data
    sink: Option<BufWriter<W>>,
    /// Encoder state
    state: State,
    /// Screen width, fixed at the first frame
    width: u16,
    /// Screen height, fixed at the first frame
    height: u16,
    /// Frame delay in centiseconds
    delay_cs: u16,
    /// Animation loop count (None: play once)
    loop_count: Option<u16>,
    /// Frame disposal method
    disposal: DisposalMethod,
    /// Has the first frame not yet been written?
    first_frame: bool,
}

impl<W: Write> Default for Encoder<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Encoder<W> {
    /// Create a new encoder.
    pub fn new() -> Self {
        Encoder {
            sink: None,
            state: State::NotStarted,
            width: 0,
            height: 0,
            delay_cs: 0,
            loop_count: None,
            disposal: DisposalMethod::default(),
            first_frame: true,
        }
    }

    /// Set the delay between frames, in milliseconds.
    ///
    /// Stored in hundredths of a second; values below 10 ms clamp to the
    /// minimum representable delay of 1.
    pub fn set_delay_millis(&mut self, ms: u32) {
        self.delay_cs = (ms / 10).clamp(1, u32::from(u16::MAX)) as u16;
    }

    /// Set the animation loop count.
    ///
    /// * `None` No looping extension is written; the animation plays once.
    /// * `Some(0)` Loop forever.
    /// * `Some(n)` Loop `n` times.
    pub fn set_loop_count(&mut self, loop_count: Option<u16>) {
        self.loop_count = loop_count;
    }

    /// Set the frame disposal method.
    pub fn set_disposal_method(&mut self, disposal: DisposalMethod) {
        self.disposal = disposal;
    }

    /// Start encoding: bind the sink and write the signature.
    pub fn start(&mut self, sink: W) -> Result<()> {
        if self.state != State::NotStarted {
            return Err(Error::NotStarted);
        }
        let mut w = BufWriter::new(sink);
        Header::default().format(&mut w)?;
        self.sink = Some(w);
        self.state = State::Started;
        debug!("started");
        Ok(())
    }

    /// Add one frame to the animation.
    ///
    /// The first frame fixes the screen dimensions and writes the global
    /// color table; later frames must match it and carry their own
    /// palettes.  A failed call leaves the encoder started, so the caller
    /// may try again.
    pub fn add_frame(&mut self, raster: &Raster<SRgb8>) -> Result<()> {
        if self.state != State::Started {
            return Err(Error::NotStarted);
        }
        let width = u16::try_from(raster.width())?;
        let height = u16::try_from(raster.height())?;
        if width == 0 || height == 0 {
            return Err(Error::InvalidFrameDimensions);
        }
        if !self.first_frame && (width, height) != (self.width, self.height) {
            return Err(Error::InvalidFrameDimensions);
        }
        debug!("frame: {}x{}", width, height);
        let indexed = Indexed::quantize(raster.as_u8_slice(), SAMPLE_FAC);
        let w = self.sink.as_mut().ok_or(Error::NotStarted)?;
        if self.first_frame {
            LogicalScreenDesc::default()
                .with_screen_width(width)
                .with_screen_height(height)
                .format(w)?;
            GlobalColorTable::with_colors(&indexed.palette).format(w)?;
            if let Some(loop_count) = self.loop_count {
                Application::with_loop_count(loop_count).format(w)?;
            }
        }
        let mut control = GraphicControl::default();
        control.set_delay_time_cs(self.delay_cs);
        control.set_disposal_method(self.disposal);
        control.format(w)?;
        ImageDesc::default()
            .with_width(width)
            .with_height(height)
            .format(w)?;
        if !self.first_frame {
            LocalColorTable::with_colors(&indexed.palette).format(w)?;
        }
        ImageData::new(indexed.pixels, MIN_CODE_SIZE).format(w)?;
        self.width = width;
        self.height = height;
        self.first_frame = false;
        Ok(())
    }

    /// Finish encoding: write the trailer and flush the sink.
    pub fn finish(&mut self) -> Result<()> {
        if self.state != State::Started {
            return Err(Error::NotStarted);
        }
        let w = self.sink.as_mut().ok_or(Error::NotStarted)?;
        Trailer::default().format(w)?;
        w.flush()?;
        self.sink = None;
        self.state = State::Finished;
        debug!("finished");
        Ok(())
    }
}

impl Header {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"GIF")?;
        w.write_all(&self.version())
    }
}

impl LogicalScreenDesc {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(7);
        let width = self.screen_width();
        buf.push(width as u8);
        buf.push((width >> 8) as u8);
        let height = self.screen_height();
        buf.push(height as u8);
        buf.push((height >> 8) as u8);
        buf.push(self.flags());
        buf.push(0); // background color index
        buf.push(0); // pixel aspect ratio
        w.write_all(&buf)
    }
}

/// Write color table bytes, zero-padded to 256 entries
fn format_colors<W: Write>(colors: &[u8], w: &mut W) -> io::Result<()> {
    w.write_all(colors)?;
    let zeros = [0; COLOR_TABLE_BYTES];
    w.write_all(&zeros[..COLOR_TABLE_BYTES - colors.len()])
}

impl GlobalColorTable {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        format_colors(self.colors(), w)
    }
}

impl GraphicControl {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(BlockCode::Extension_.signature())?;
        let mut buf = Vec::with_capacity(8);
        buf.push(ExtensionCode::GraphicControl_.into());
        buf.push(4); // block size
        buf.push(0); // no transparent color or user input
        let delay = self.delay_time_cs();
        buf.push(delay as u8);
        buf.push((delay >> 8) as u8);
        buf.push(u8::from(self.disposal_method()) & 0x07);
        buf.push(0);
        buf.push(0); // block terminator
        w.write_all(&buf)
    }
}

impl Application {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(BlockCode::Extension_.signature())?;
        w.write_all(&[ExtensionCode::Application_.into()])?;
        for b in self.app_data() {
            assert!(b.len() < 256);
            let len = b.len() as u8;
            w.write_all(&[len])?; // block size
            w.write_all(b)?;
        }
        w.write_all(&[0]) // block size
    }
}

impl ImageDesc {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(BlockCode::ImageDesc_.signature())?;
        let mut buf = Vec::with_capacity(9);
        buf.push(0); // left
        buf.push(0);
        buf.push(0); // top
        buf.push(0);
        let width = self.width();
        buf.push(width as u8);
        buf.push((width >> 8) as u8);
        let height = self.height();
        buf.push(height as u8);
        buf.push((height >> 8) as u8);
        buf.push(0); // flags
        w.write_all(&buf)
    }
}

impl LocalColorTable {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        format_colors(self.colors(), w)
    }
}

impl ImageData {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(self.data().len() / 4 + 16);
        Compressor::new(self.min_code_size()).compress(self.data(), &mut buf);
        w.write_all(&buf)?;
        w.write_all(&[0]) // block terminator
    }
}

impl Trailer {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(BlockCode::Trailer_.signature())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lzw;

    /// Structural summary of an encoded animation
    struct Anim {
        width: u16,
        height: u16,
        loop_count: Option<u16>,
        delays: Vec<u16>,
        planes: Vec<Vec<u8>>,
    }

    fn le16(buf: &[u8]) -> u16 {
        u16::from(buf[0]) | u16::from(buf[1]) << 8
    }

    /// Walk an encoded byte stream, checking framing along the way
    fn walk(gif: &[u8]) -> Anim {
        assert_eq!(&gif[..6], b"GIF89a");
        let width = le16(&gif[6..]);
        let height = le16(&gif[8..]);
        assert_eq!(gif[10], 0x87); // global table present, 256 entries
        assert_eq!(gif[11], 0); // background color index
        assert_eq!(gif[12], 0); // pixel aspect ratio
        let mut pos = 13 + 768;
        let mut loop_count = None;
        if gif[pos] == 0x21 && gif[pos + 1] == 0xFF {
            assert_eq!(gif[pos + 2], 11);
            assert_eq!(&gif[pos + 3..pos + 14], b"NETSCAPE2.0");
            assert_eq!(gif[pos + 14], 3);
            assert_eq!(gif[pos + 15], 1);
            loop_count = Some(le16(&gif[pos + 16..]));
            assert_eq!(gif[pos + 18], 0);
            pos += 19;
        }
        let mut delays = vec![];
        let mut planes = vec![];
        while gif[pos] != 0x3B {
            // graphic control extension
            assert_eq!(&gif[pos..pos + 4], &[0x21, 0xF9, 0x04, 0x00]);
            delays.push(le16(&gif[pos + 4..]));
            assert_eq!(gif[pos + 7], 0);
            assert_eq!(gif[pos + 8], 0);
            pos += 9;
            // image descriptor
            assert_eq!(gif[pos], 0x2C);
            assert_eq!(le16(&gif[pos + 1..]), 0); // left
            assert_eq!(le16(&gif[pos + 3..]), 0); // top
            assert_eq!(le16(&gif[pos + 5..]), width);
            assert_eq!(le16(&gif[pos + 7..]), height);
            assert_eq!(gif[pos + 9], 0);
            pos += 10;
            if !planes.is_empty() {
                pos += 768; // local color table
            }
            // compressed image data
            let data_start = pos;
            assert_eq!(gif[pos], 8); // minimum code size
            pos += 1;
            loop {
                let len = usize::from(gif[pos]);
                assert!(len <= 255);
                pos += 1 + len;
                if len == 0 {
                    break;
                }
            }
            planes.push(lzw::decompress(&gif[data_start..pos], 8));
        }
        assert_eq!(pos, gif.len() - 1);
        Anim {
            width,
            height,
            loop_count,
            delays,
            planes,
        }
    }

    fn rgb_raster(colors: &[[u8; 3]], width: u32, height: u32)
        -> Raster<SRgb8>
    {
        let mut buf = Vec::with_capacity(colors.len() * 3);
        for c in colors {
            buf.extend_from_slice(c);
        }
        Raster::with_u8_buffer(width, height, buf)
    }

    #[test]
    fn not_started_guards() {
        let mut enc = Encoder::<Vec<u8>>::new();
        let raster = Raster::<SRgb8>::with_clear(2, 2);
        assert!(matches!(enc.add_frame(&raster), Err(Error::NotStarted)));
        assert!(matches!(enc.finish(), Err(Error::NotStarted)));
    }

    #[test]
    fn finished_guards() {
        let mut gif = Vec::new();
        let mut enc = Encoder::new();
        enc.start(&mut gif).unwrap();
        let raster = Raster::<SRgb8>::with_clear(2, 2);
        enc.add_frame(&raster).unwrap();
        enc.finish().unwrap();
        assert!(matches!(enc.add_frame(&raster), Err(Error::NotStarted)));
        assert!(matches!(enc.finish(), Err(Error::NotStarted)));
    }

    #[test]
    fn start_twice() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        let mut enc = Encoder::new();
        enc.start(&mut a).unwrap();
        assert!(matches!(enc.start(&mut b), Err(Error::NotStarted)));
    }

    #[test]
    fn single_frame() {
        let raster = rgb_raster(
            &[[255, 0, 0], [255, 0, 0], [0, 255, 0], [0, 0, 255]],
            2,
            2,
        );
        let mut gif = Vec::new();
        let mut enc = Encoder::new();
        enc.set_delay_millis(100);
        enc.set_loop_count(Some(0));
        enc.start(&mut gif).unwrap();
        enc.add_frame(&raster).unwrap();
        enc.finish().unwrap();
        drop(enc);
        let anim = walk(&gif);
        assert_eq!((anim.width, anim.height), (2, 2));
        assert_eq!(anim.loop_count, Some(0));
        assert_eq!(anim.delays, [10]);
        assert_eq!(anim.planes.len(), 1);
        let plane = &anim.planes[0];
        assert_eq!(plane.len(), 4);
        // duplicate colors quantize to the same index
        assert_eq!(plane[0], plane[1]);
    }

    #[test]
    fn delay_clamp() {
        for (ms, cs) in [(5, 1), (0, 1), (10, 1), (100, 10), (1500, 150)] {
            let mut gif = Vec::new();
            let mut enc = Encoder::new();
            enc.set_delay_millis(ms);
            enc.start(&mut gif).unwrap();
            enc.add_frame(&Raster::<SRgb8>::with_clear(3, 3)).unwrap();
            enc.finish().unwrap();
            drop(enc);
            assert_eq!(walk(&gif).delays, [cs]);
        }
    }

    #[test]
    fn multi_frame() {
        let mut gif = Vec::new();
        let mut enc = Encoder::new();
        enc.set_delay_millis(50);
        enc.set_loop_count(Some(3));
        enc.start(&mut gif).unwrap();
        for shade in [0u8, 128, 255] {
            let colors = [[shade, 64, 255 - shade]; 16];
            enc.add_frame(&rgb_raster(&colors, 4, 4)).unwrap();
        }
        enc.finish().unwrap();
        drop(enc);
        let anim = walk(&gif);
        assert_eq!(anim.loop_count, Some(3));
        assert_eq!(anim.delays, [5, 5, 5]);
        assert_eq!(anim.planes.len(), 3);
        for plane in &anim.planes {
            assert_eq!(plane.len(), 16);
        }
    }

    #[test]
    fn no_loop_extension() {
        let mut gif = Vec::new();
        let mut enc = Encoder::new();
        enc.start(&mut gif).unwrap();
        enc.add_frame(&Raster::<SRgb8>::with_clear(2, 2)).unwrap();
        enc.finish().unwrap();
        drop(enc);
        let anim = walk(&gif);
        assert_eq!(anim.loop_count, None);
        assert_eq!(anim.planes.len(), 1);
    }

    #[test]
    fn mismatched_frame_rejected() {
        let mut gif = Vec::new();
        let mut enc = Encoder::new();
        enc.start(&mut gif).unwrap();
        enc.add_frame(&Raster::<SRgb8>::with_clear(4, 4)).unwrap();
        let bad = Raster::<SRgb8>::with_clear(5, 4);
        assert!(matches!(
            enc.add_frame(&bad),
            Err(Error::InvalidFrameDimensions)
        ));
        // still started; a matching frame is accepted
        enc.add_frame(&Raster::<SRgb8>::with_clear(4, 4)).unwrap();
        enc.finish().unwrap();
        drop(enc);
        assert_eq!(walk(&gif).planes.len(), 2);
    }
}
