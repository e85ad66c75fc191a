//! ArcGIS MapServer `export` request construction

use super::{TileAddress, TILE_SIZE, WEB_MERCATOR_WKID};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Parameters computed per tile; callers cannot override these.
const RESERVED_PARAMS: [&str; 5] = ["bbox", "bboxSR", "imageSR", "size", "f"];

/// An export request against one MapServer, ready to be pointed at a tile
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    base_url: String,
    params: BTreeMap<String, String>,
    pixel_ratio: f64,
}

impl ExportRequest {
    /// `base_url` is the MapServer endpoint, e.g. `.../rest/services/Foo/MapServer`
    pub fn new(base_url: &str, pixel_ratio: f64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            params: BTreeMap::new(),
            pixel_ratio,
        }
    }

    /// Seed export parameters. Empty values are skipped, which lets a config
    /// file switch a built-in default off.
    #[must_use]
    pub fn with_defaults(mut self, defaults: &BTreeMap<String, String>) -> Self {
        for (key, value) in defaults {
            if !value.is_empty() && !is_reserved(key) {
                self.params.insert(key.clone(), value.clone());
            }
        }
        self
    }

    /// Caller-supplied parameters, replacing any default with the same key.
    ///
    /// `bbox`, `bboxSR`, `imageSR`, `size` and `f` (any case) are dropped:
    /// the tile address and pixel ratio determine them.
    #[must_use]
    pub fn with_params<I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in params {
            if !is_reserved(&key) {
                self.params.insert(key, value);
            }
        }
        self
    }

    /// Output edge length in pixels
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn image_size(&self) -> u32 {
        (f64::from(TILE_SIZE) * self.pixel_ratio).round().max(1.0) as u32
    }

    /// Full upstream URL that renders `tile`
    pub fn tile_url(&self, tile: &TileAddress) -> String {
        let size = self.image_size();
        let mut url = format!(
            "{}/export?bbox={}&bboxSR={WEB_MERCATOR_WKID}&imageSR={WEB_MERCATOR_WKID}&size={size},{size}&f=image",
            self.base_url,
            tile.bounds(),
        );
        if !self.params.is_empty() {
            let extra = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.params)
                .finish();
            url.push('&');
            url.push_str(&extra);
        }
        url
    }
}

fn is_reserved(key: &str) -> bool {
    RESERVED_PARAMS.iter().any(|r| r.eq_ignore_ascii_case(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP_SERVER: &str =
        "https://services.arcgisonline.com/ArcGIS/rest/services/Specialty/World_Navigation_Charts/MapServer";

    fn defaults() -> BTreeMap<String, String> {
        BTreeMap::from([("transparent".to_string(), "true".to_string())])
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_world_tile_url() {
        let url = ExportRequest::new(MAP_SERVER, 1.0)
            .with_defaults(&defaults())
            .tile_url(&TileAddress::new(0, 0, 0));
        assert_eq!(
            url,
            format!(
                "{MAP_SERVER}/export?bbox=-20037508.3427892,-20037508.3427892,20037508.3427892,20037508.3427892\
                 &bboxSR=3857&imageSR=3857&size=256,256&f=image&transparent=true"
            )
        );
    }

    #[test]
    fn test_caller_overrides_default() {
        let url = ExportRequest::new(MAP_SERVER, 1.0)
            .with_defaults(&defaults())
            .with_params(pairs(&[("transparent", "false")]))
            .tile_url(&TileAddress::new(1, 0, 0));
        assert!(url.ends_with("&f=image&transparent=false"), "{url}");
        assert_eq!(url.matches("transparent").count(), 1);
    }

    #[test]
    fn test_params_are_encoded() {
        let url = ExportRequest::new(MAP_SERVER, 1.0)
            .with_params(pairs(&[("layers", "show:14"), ("layerDefs", "0:NAME = 'A&B'")]))
            .tile_url(&TileAddress::new(2, 1, 1));
        assert!(url.contains("&layers=show%3A14"), "{url}");
        assert!(url.contains("&layerDefs=0%3ANAME+%3D+%27A%26B%27"), "{url}");
    }

    #[test]
    fn test_reserved_params_ignored() {
        let url = ExportRequest::new(MAP_SERVER, 1.0)
            .with_params(pairs(&[("bbox", "0,0,1,1"), ("F", "json"), ("dpi", "96")]))
            .tile_url(&TileAddress::new(0, 0, 0));
        assert_eq!(url.matches("bbox=").count(), 1);
        assert!(!url.contains("json"));
        assert!(url.ends_with("&f=image&dpi=96"), "{url}");
    }

    #[test]
    fn test_empty_default_is_skipped() {
        let mut defaults = defaults();
        defaults.insert("transparent".to_string(), String::new());
        let url = ExportRequest::new(MAP_SERVER, 1.0)
            .with_defaults(&defaults)
            .tile_url(&TileAddress::new(0, 0, 0));
        assert!(url.ends_with("&f=image"), "{url}");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let url = ExportRequest::new(&format!("{MAP_SERVER}/"), 1.0).tile_url(&TileAddress::new(0, 0, 0));
        assert!(url.starts_with(&format!("{MAP_SERVER}/export?")), "{url}");
    }

    #[test]
    fn test_pixel_ratio_scales_size() {
        let hidpi = ExportRequest::new(MAP_SERVER, 2.0);
        assert_eq!(hidpi.image_size(), 512);
        assert!(hidpi
            .tile_url(&TileAddress::new(3, 2, 1))
            .contains("&size=512,512&"));
        assert_eq!(ExportRequest::new(MAP_SERVER, 1.5).image_size(), 384);
    }
}
