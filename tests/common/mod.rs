//! In-memory collaborators and image helpers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imgly_bgcompose::{
    BackgroundService, ImageFetcher, MemoryNotifier, PreviewConfig, PreviewError, PreviewSession,
    RemovedImage, Result, Upload,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const GRAY: [u8; 4] = [128, 128, 128, 255];

/// Encode an image as PNG bytes
pub fn encode_png(image: RgbaImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("Failed to encode test PNG");
    buffer
}

/// Solid-color PNG
pub fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    encode_png(RgbaImage::from_pixel(width, height, Rgba(color)))
}

/// A cut-out: transparent left half, opaque `color` right half
pub fn cutout_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba(color)
        }
    });
    encode_png(image)
}

pub fn upload(width: u32, height: u32) -> Upload {
    Upload::new("portrait.png", solid_png(width, height, GRAY)).with_content_type("image/png")
}

/// Scripted response of the fake removal endpoint
#[derive(Debug, Clone)]
pub enum RemovalReply {
    Image(Vec<u8>),
    Status(u16, String),
}

/// Scripted response of the fake backgrounds endpoint
#[derive(Debug, Clone)]
pub enum GalleryReply {
    Urls(Vec<String>),
    Fail(String),
}

/// `BackgroundService` answering from scripts, with optional per-call delays
#[derive(Default)]
pub struct FakeService {
    removal: Mutex<Option<(Duration, RemovalReply)>>,
    galleries: Mutex<HashMap<String, (Duration, GalleryReply)>>,
    removal_calls: AtomicUsize,
    gallery_calls: AtomicUsize,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_removal(self, reply: RemovalReply) -> Self {
        self.with_removal_delay(Duration::ZERO, reply)
    }

    pub fn with_removal_delay(self, delay: Duration, reply: RemovalReply) -> Self {
        *self.removal.lock().unwrap() = Some((delay, reply));
        self
    }

    pub fn with_gallery(self, category: &str, reply: GalleryReply) -> Self {
        self.with_gallery_delay(category, Duration::ZERO, reply)
    }

    pub fn with_gallery_delay(self, category: &str, delay: Duration, reply: GalleryReply) -> Self {
        self.galleries
            .lock()
            .unwrap()
            .insert(category.to_string(), (delay, reply));
        self
    }

    pub fn removal_calls(&self) -> usize {
        self.removal_calls.load(Ordering::SeqCst)
    }

    pub fn gallery_calls(&self) -> usize {
        self.gallery_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundService for FakeService {
    async fn remove_background(&self, _upload: &Upload) -> Result<RemovedImage> {
        self.removal_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.removal.lock().unwrap().clone();
        let (delay, reply) = scripted
            .unwrap_or_else(|| (Duration::ZERO, RemovalReply::Status(503, String::new())));
        tokio::time::sleep(delay).await;
        match reply {
            RemovalReply::Image(bytes) => Ok(RemovedImage {
                bytes,
                content_type: Some("image/png".to_string()),
            }),
            RemovalReply::Status(status, body) => Err(PreviewError::removal(
                PreviewError::status_error("/remove-background", status, &body),
            )),
        }
    }

    async fn list_backgrounds(&self, category: &str) -> Result<Vec<String>> {
        self.gallery_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.galleries.lock().unwrap().get(category).cloned();
        let (delay, reply) =
            scripted.unwrap_or_else(|| (Duration::ZERO, GalleryReply::Urls(Vec::new())));
        tokio::time::sleep(delay).await;
        match reply {
            GalleryReply::Urls(urls) => Ok(urls),
            GalleryReply::Fail(message) => Err(PreviewError::gallery(message)),
        }
    }
}

/// `ImageFetcher` serving registered URLs; anything else is a 404
#[derive(Default)]
pub struct FakeFetcher {
    images: Mutex<HashMap<String, (Duration, Vec<u8>)>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self, url: &str, bytes: Vec<u8>) -> Self {
        self.with_image_delay(url, Duration::ZERO, bytes)
    }

    pub fn with_image_delay(self, url: &str, delay: Duration, bytes: Vec<u8>) -> Self {
        self.images
            .lock()
            .unwrap()
            .insert(url.to_string(), (delay, bytes));
        self
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let entry = self.images.lock().unwrap().get(url).cloned();
        match entry {
            Some((delay, bytes)) => {
                tokio::time::sleep(delay).await;
                Ok(bytes)
            },
            None => Err(PreviewError::Network(format!("{} returned HTTP 404", url))),
        }
    }
}

/// A session wired to fakes
pub struct Harness {
    pub session: PreviewSession,
    pub service: Arc<FakeService>,
    pub notifier: MemoryNotifier,
}

impl Harness {
    pub fn new(service: FakeService, fetcher: FakeFetcher) -> Self {
        let service = Arc::new(service);
        let notifier = MemoryNotifier::new();
        let session = PreviewSession::builder(PreviewConfig::default())
            .service(service.clone())
            .fetcher(Arc::new(fetcher))
            .notifier(Arc::new(notifier.clone()))
            .build()
            .expect("Failed to build test session");
        Self {
            session,
            service,
            notifier,
        }
    }
}
