use crate::api::{ApiResult, GalleryImage, ProfileInfo, Video};
use crate::data::ProfileService;
use crate::render::{self, Node};

/// Avatar, video list and photo gallery. Load failures are only logged; the
/// previous content stays on screen.
#[derive(Debug, Clone, Default)]
pub struct ProfileController {
    avatar: Option<String>,
    videos: Vec<Video>,
    gallery: Vec<GalleryImage>,
}

impl ProfileController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn gallery(&self) -> &[GalleryImage] {
        &self.gallery
    }

    pub fn load_info(&mut self, service: &dyn ProfileService) {
        self.apply_info(service.load_info());
    }

    pub fn apply_info(&mut self, result: ApiResult<ProfileInfo>) {
        match result {
            Ok(info) => {
                if let Some(avatar) = info.avatar.filter(|url| !url.trim().is_empty()) {
                    self.avatar = Some(avatar);
                }
                self.videos = info.videos;
            }
            Err(err) => tracing::error!(error = %err, "loading profile info failed"),
        }
    }

    pub fn load_gallery(&mut self, service: &dyn ProfileService) {
        self.apply_gallery(service.load_gallery());
    }

    pub fn apply_gallery(&mut self, result: ApiResult<Vec<GalleryImage>>) {
        match result {
            Ok(images) => self.gallery = images,
            Err(err) => tracing::error!(error = %err, "loading gallery failed"),
        }
    }

    pub fn render_avatar(&self, name: &str) -> Node {
        render::avatar(self.avatar.as_deref(), name)
    }

    pub fn render_videos(&self) -> Node {
        render::video_grid(&self.videos)
    }

    pub fn render_gallery(&self) -> Node {
        render::gallery_grid(&self.gallery)
    }
}
