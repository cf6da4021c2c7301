//! Satellite basemap tiles. No upstream call; the client renders the template.

use async_trait::async_trait;
use geolayer_core::{BoundingBox, ImageryInfo};

use crate::provider::ProviderAdapter;

pub const WORLD_IMAGERY_URL: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";

pub struct ImageryProvider {
    tile_url: String,
}

impl ImageryProvider {
    pub fn new(tile_url: impl Into<String>) -> Self {
        Self {
            tile_url: tile_url.into(),
        }
    }
}

impl Default for ImageryProvider {
    fn default() -> Self {
        Self::new(WORLD_IMAGERY_URL)
    }
}

#[async_trait]
impl ProviderAdapter for ImageryProvider {
    type Query = BoundingBox;
    type Record = ImageryInfo;

    fn name(&self) -> &str {
        "Esri World Imagery"
    }

    async fn fetch(&self, bbox: &BoundingBox) -> Option<ImageryInfo> {
        Some(ImageryInfo {
            tile_url: self.tile_url.clone(),
            bbox: *bbox,
            description: "Satellite imagery basemap".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_template_and_box() {
        let bbox = BoundingBox::new(30.0, 40.0, 130.0, 140.0).unwrap();
        let info = ImageryProvider::default().fetch(&bbox).await.unwrap();
        assert!(info.tile_url.contains("{z}/{y}/{x}"));
        assert_eq!(info.bbox, bbox);
    }
}
