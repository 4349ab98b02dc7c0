use bytes::Bytes;
use image::{DynamicImage, ImageFormat, ImageResult};
use std::io::Cursor;

/// Something that can produce the source bytes sent to the face service.
pub trait ReferenceSource: Send + Sync {
    fn name(&self) -> &str;

    /// Serialises the reference image. Called once per matching run.
    fn encode(&self) -> ImageResult<Bytes>;
}

/// An uploaded photo held in memory, decoded, with the format it arrived in.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    name: String,
    image: DynamicImage,
    format: ImageFormat,
}

impl ReferenceImage {
    pub fn decode(name: impl Into<String>, data: &[u8]) -> ImageResult<Self> {
        let format = image::guess_format(data)?;
        let image = image::load_from_memory_with_format(data, format)?;
        Ok(Self {
            name: name.into(),
            image,
            format,
        })
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

impl ReferenceSource for ReferenceImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self) -> ImageResult<Bytes> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, self.format)?;
        Ok(Bytes::from(buf.into_inner()))
    }
}
