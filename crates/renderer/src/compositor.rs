//! Layer compositor.
//!
//! Fetches every layer for a center point and radius, projects them into
//! the UTM zone of the center, and draws them in fixed z-order with the
//! theme's colors. Only the street network is mandatory; any other layer
//! whose fetch fails is skipped with a warning. Cache read failures are
//! fatal for every layer.

use geo_types::Polygon;
use metrics::{counter, histogram};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use osm_data::{
    CachedSource, FeatureCollection, Geocoder, LayerKind, MapDataSource, NominatimClient,
    OverpassClient, StreetNetwork,
};
use poster_common::{BoundingBox, LatLon, PosterError, PosterRequest, PosterResult, PosterSettings, Theme};
use projection::UtmProjection;
use storage::{ContentCache, LandPolygonStore};

use crate::canvas::Canvas;
use crate::crop::CropLimits;
use crate::gradient::add_fades;
use crate::layers;
use crate::output::{write_artifact, FontContext};
use crate::style::{zorder, RoadClass, RAILWAY_WIDTH};
use crate::typography::{draw_labels, PosterLabels};

/// Layers fetched for every poster, in fetch order. Maritime boundaries are
/// only fetched when the coastline layer is non-empty.
const OPTIONAL_LAYERS: [LayerKind; 7] = [
    LayerKind::AdminBoundaries,
    LayerKind::Landuse,
    LayerKind::Water,
    LayerKind::Parks,
    LayerKind::Railways,
    LayerKind::Buildings,
    LayerKind::Coastline,
];

// ============================================================================
// Fetched data
// ============================================================================

/// Everything drawn on one poster, in WGS84.
#[derive(Debug, Clone, Default)]
pub struct PosterData {
    pub network: StreetNetwork,
    pub layers: HashMap<LayerKind, FeatureCollection>,
    /// `None` when the land polygon dataset is unavailable.
    pub land: Option<Vec<Polygon<f64>>>,
}

impl PosterData {
    pub fn new(network: StreetNetwork) -> Self {
        Self {
            network,
            ..Default::default()
        }
    }

    pub fn with_layer(mut self, kind: LayerKind, collection: FeatureCollection) -> Self {
        self.layers.insert(kind, collection);
        self
    }

    pub fn with_land(mut self, land: Option<Vec<Polygon<f64>>>) -> Self {
        self.land = land;
        self
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&FeatureCollection> {
        self.layers.get(&kind)
    }

    pub fn has_coastline(&self) -> bool {
        self.layer(LayerKind::Coastline)
            .map(|c| !c.is_empty())
            .unwrap_or(false)
    }
}

/// How the land layer is painted.
#[derive(Debug, Clone, PartialEq)]
pub enum LandFill {
    Polygons(Vec<Polygon<f64>>),
    Rectangle,
}

/// Land polygons when the dataset has any for the area, otherwise the whole
/// page is land. Administrative areas are never painted as land.
pub fn land_fill(data: &PosterData) -> LandFill {
    match &data.land {
        Some(polygons) if !polygons.is_empty() => LandFill::Polygons(polygons.clone()),
        _ => LandFill::Rectangle,
    }
}

// ============================================================================
// Composition
// ============================================================================

/// Compose the poster as SVG.
pub fn compose(
    request: &PosterRequest,
    theme: &Theme,
    data: &PosterData,
    font_family: &str,
) -> PosterResult<String> {
    request.validate()?;
    if data.network.is_empty() {
        return Err(PosterError::EmptyNetwork);
    }

    let center = request.center;
    let dist = request.compensated_distance();
    let utm = UtmProjection::for_point(center.lat, center.lon);
    let (cx, cy) = utm.forward(center.lat, center.lon);
    if !(cx.is_finite() && cy.is_finite()) {
        return Err(PosterError::ProjectionError(format!(
            "center {} does not project into UTM zone {}",
            center, utm.zone
        )));
    }

    let crop = CropLimits::new(cx, cy, dist, request.width_in, request.height_in);
    let mut canvas = Canvas::new(request.width_in, request.height_in, crop);
    let empty = FeatureCollection::default();
    let layer = |kind: LayerKind| data.layer(kind).unwrap_or(&empty);

    let coastal = data.has_coastline();
    if coastal {
        canvas.fill_page(zorder::SEA, theme.water);
    }

    match land_fill(data) {
        LandFill::Polygons(polygons) => {
            let projected = layers::project_polygons(&polygons, &utm);
            canvas.fill_polygons(zorder::LAND, &projected, theme.bg);
        }
        LandFill::Rectangle => canvas.fill_page(zorder::LAND, theme.bg),
    }

    if coastal {
        let maritime = layers::polygons(layer(LayerKind::Maritime));
        canvas.fill_polygons(
            zorder::MARITIME,
            &layers::project_polygons(&maritime, &utm),
            theme.water,
        );
    }

    let polygon_layers = [
        (LayerKind::Landuse, zorder::LANDUSE, theme.bg),
        (LayerKind::Buildings, zorder::BUILDINGS, theme.buildings_color()),
        (LayerKind::Parks, zorder::PARKS, theme.parks),
    ];
    for (kind, z, color) in polygon_layers {
        let polygons = layers::polygons(layer(kind));
        let drawn = canvas.fill_polygons(z, &layers::project_polygons(&polygons, &utm), color);
        debug!(layer = kind.name(), drawn, "Drew polygons");
    }

    let water = layers::water_polygons(layer(LayerKind::Water));
    canvas.fill_polygons(zorder::WATER, &layers::project_polygons(&water, &utm), theme.water);

    let mut roads: HashMap<RoadClass, Vec<_>> = HashMap::new();
    for (class, line) in layers::project_network(&data.network, &utm) {
        roads.entry(class).or_default().push(line);
    }
    for class in RoadClass::paint_order() {
        if let Some(lines) = roads.get(&class) {
            canvas.stroke_lines(zorder::ROADS, lines, class.color(theme), class.width());
        }
    }

    let railways = layers::lines(layer(LayerKind::Railways));
    canvas.stroke_lines(
        zorder::RAILWAYS,
        &layers::project_lines(&railways, &utm),
        theme.road_primary,
        RAILWAY_WIDTH,
    );

    add_fades(&mut canvas, theme.gradient_color, request.gradient_height);

    let labels = PosterLabels {
        city: request.display_city().to_string(),
        country: request.display_country().to_string(),
        coordinates: center.poster_label(),
    };
    draw_labels(
        &mut canvas,
        theme,
        &labels,
        request.width_in,
        request.height_in,
        font_family,
    );

    debug!(items = canvas.len(), coastal, "Composed poster");
    Ok(canvas.render(theme.bg))
}

// ============================================================================
// Compositor
// ============================================================================

/// Owns the data sources and land dataset used to generate posters.
pub struct PosterCompositor {
    data: Arc<dyn MapDataSource>,
    geocoder: Arc<dyn Geocoder>,
    land: Arc<LandPolygonStore>,
    fonts: FontContext,
    dpi: u32,
}

impl PosterCompositor {
    pub fn new(
        data: Arc<dyn MapDataSource>,
        geocoder: Arc<dyn Geocoder>,
        land: Arc<LandPolygonStore>,
        fonts: FontContext,
    ) -> Self {
        Self {
            data,
            geocoder,
            land,
            fonts,
            dpi: 300,
        }
    }

    /// Network-backed compositor with both sources behind one content cache.
    pub fn from_settings(settings: &PosterSettings) -> PosterResult<Self> {
        let cache = ContentCache::new(&settings.cache_dir).with_ttl(settings.cache_ttl());

        let overpass = OverpassClient::new(
            settings.overpass_url.clone(),
            &settings.user_agent,
            settings.fetch_timeout(),
        )?;
        let nominatim = NominatimClient::new(
            settings.nominatim_url.clone(),
            &settings.user_agent,
            settings.geocode_timeout(),
            settings.geocode_interval(),
        )?;

        let fonts = FontContext::load(&settings.font_family, settings.font_dir.as_deref());
        Ok(Self::new(
            Arc::new(CachedSource::new(overpass, cache.clone())),
            Arc::new(CachedSource::new(nominatim, cache)),
            Arc::new(LandPolygonStore::new(&settings.land_polygons_path)),
            fonts,
        )
        .with_dpi(settings.dpi))
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn fonts(&self) -> &FontContext {
        &self.fonts
    }

    pub fn geocoder(&self) -> &Arc<dyn Geocoder> {
        &self.geocoder
    }

    /// Use `coordinates` when given, otherwise geocode the place.
    pub async fn resolve_center(
        &self,
        city: &str,
        country: &str,
        coordinates: Option<LatLon>,
    ) -> PosterResult<LatLon> {
        if let Some(point) = coordinates {
            info!(lat = point.lat, lon = point.lon, "Using coordinate override");
            return Ok(point);
        }
        if city.trim().is_empty() {
            return Err(PosterError::MissingParameter("city".into()));
        }
        if country.trim().is_empty() {
            return Err(PosterError::MissingParameter("country".into()));
        }
        self.geocoder.geocode(city, country).await
    }

    /// Fetch the network and every optional layer around `center`.
    #[instrument(skip(self), fields(lat = center.lat, lon = center.lon))]
    pub async fn fetch_layers(&self, center: LatLon, dist: f64) -> PosterResult<PosterData> {
        let start = Instant::now();

        let network = self.data.street_network(center, dist).await?;
        if network.is_empty() {
            return Err(PosterError::EmptyNetwork);
        }
        let mut data = PosterData::new(network);

        for kind in OPTIONAL_LAYERS {
            if let Some(collection) = self.optional_layer(center, dist, kind).await? {
                data.layers.insert(kind, collection);
            }
        }

        if data.has_coastline() {
            if let Some(maritime) = self.optional_layer(center, dist, LayerKind::Maritime).await? {
                data.layers.insert(LayerKind::Maritime, maritime);
            }
        }

        let land = Arc::clone(&self.land);
        let bbox = BoundingBox::around(center, dist);
        data.land = tokio::task::spawn_blocking(move || land.polygons_in(&bbox))
            .await
            .map_err(|e| PosterError::InternalError(format!("land polygon task failed: {}", e)))?;
        if data.land.is_none() {
            warn!("Land polygons not available, using fallback");
        }

        info!(
            edges = data.network.len(),
            layers = data.layers.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched poster data"
        );
        Ok(data)
    }

    /// `None` when the fetch failed; a cache read failure is returned.
    async fn optional_layer(
        &self,
        center: LatLon,
        dist: f64,
        kind: LayerKind,
    ) -> PosterResult<Option<FeatureCollection>> {
        match self.data.features(center, dist, kind).await {
            Ok(collection) => Ok(Some(collection)),
            Err(e @ PosterError::CacheRead { .. }) => Err(e),
            Err(e) => {
                warn!(layer = kind.name(), error = %e, "Skipping layer");
                counter!("poster_layer_fetch_failures_total", "layer" => kind.name()).increment(1);
                Ok(None)
            }
        }
    }

    /// Compose and encode off the async runtime.
    pub async fn render(
        &self,
        request: &PosterRequest,
        theme: &Theme,
        data: PosterData,
    ) -> PosterResult<Vec<u8>> {
        let request = request.clone();
        let theme = theme.clone();
        let fonts = self.fonts.clone();
        let dpi = self.dpi;

        tokio::task::spawn_blocking(move || {
            let svg = compose(&request, &theme, &data, fonts.family())?;
            fonts.encode(&svg, request.format, dpi)
        })
        .await
        .map_err(|e| PosterError::InternalError(format!("render task failed: {}", e)))?
    }

    /// Fetch, compose, encode and save one poster.
    #[instrument(skip(self, request, theme), fields(city = %request.city, theme = %theme.name))]
    pub async fn generate(&self, request: &PosterRequest, theme: &Theme) -> PosterResult<PathBuf> {
        request.validate()?;
        if request.output_path.as_os_str().is_empty() {
            return Err(PosterError::MissingParameter("output path".into()));
        }
        let start = Instant::now();

        let data = self
            .fetch_layers(request.center, request.compensated_distance())
            .await?;
        let bytes = self.render(request, theme, data).await?;
        let path = write_artifact(&request.output_path, &bytes).await?;

        let elapsed = start.elapsed();
        counter!("posters_generated_total").increment(1);
        histogram!("poster_render_duration_ms").record(millis(elapsed));
        info!(
            path = %path.display(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Poster generated"
        );
        Ok(path)
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, polygon, Geometry};
    use osm_data::{Feature, StreetEdge};

    fn network() -> StreetNetwork {
        StreetNetwork {
            edges: vec![StreetEdge {
                way_id: 1,
                highway: Some("primary".into()),
                geometry: line_string![(x: 5.30, y: 43.78), (x: 5.33, y: 43.79)],
            }],
        }
    }

    fn coastline() -> FeatureCollection {
        FeatureCollection::new(
            "coastline",
            vec![Feature {
                id: 1,
                geometry: Geometry::LineString(line_string![(x: 5.0, y: 43.0), (x: 5.1, y: 43.0)]),
                tags: Default::default(),
            }],
        )
    }

    fn admin() -> FeatureCollection {
        FeatureCollection::new(
            "admin_boundaries",
            vec![Feature {
                id: 2,
                geometry: Geometry::Polygon(
                    polygon![(x: 5.2, y: 43.7), (x: 5.4, y: 43.7), (x: 5.4, y: 43.9), (x: 5.2, y: 43.9)],
                ),
                tags: Default::default(),
            }],
        )
    }

    #[test]
    fn test_no_land_no_coast_is_rectangle() {
        let data = PosterData::new(network());
        assert_eq!(land_fill(&data), LandFill::Rectangle);
    }

    #[test]
    fn test_empty_land_result_is_rectangle() {
        let data = PosterData::new(network()).with_land(Some(Vec::new()));
        assert_eq!(land_fill(&data), LandFill::Rectangle);
    }

    #[test]
    fn test_coast_without_dataset_is_rectangle() {
        let data = PosterData::new(network())
            .with_layer(LayerKind::Coastline, coastline())
            .with_layer(LayerKind::AdminBoundaries, admin());
        assert!(data.has_coastline());
        assert_eq!(land_fill(&data), LandFill::Rectangle);
    }

    #[test]
    fn test_dataset_polygons_win_on_coast() {
        let land = vec![polygon![(x: 5.2, y: 43.7), (x: 5.4, y: 43.7), (x: 5.4, y: 43.8)]];
        let data = PosterData::new(network())
            .with_layer(LayerKind::Coastline, coastline())
            .with_land(Some(land.clone()));
        assert_eq!(land_fill(&data), LandFill::Polygons(land));
    }

    #[test]
    fn test_compose_rejects_empty_network() {
        let request = PosterRequest::new("Lauris", "France", LatLon::new(43.7833, 5.3167));
        let err = compose(&request, &Theme::terracotta(), &PosterData::default(), "Roboto").unwrap_err();
        assert!(matches!(err, PosterError::EmptyNetwork));
    }

    #[test]
    fn test_sea_only_drawn_on_coast() {
        let request = PosterRequest::new("Lauris", "France", LatLon::new(43.7833, 5.3167));
        let theme = Theme::terracotta();
        let water = theme.water.to_hex();

        let inland = compose(&request, &theme, &PosterData::new(network()), "Roboto").unwrap();
        assert!(!inland.contains(&water));

        let coastal_data = PosterData::new(network()).with_layer(LayerKind::Coastline, coastline());
        let coastal = compose(&request, &theme, &coastal_data, "Roboto").unwrap();
        assert!(coastal.contains(&water));
    }
}
