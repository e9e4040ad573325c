use log::{debug, info, warn};

use partisan_blocks::*;
use snafu::{prelude::*, Snafu};

use std::collections::{HashMap, VecDeque};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::mapblue::config_reader::*;
use crate::mapblue::io_common::*;
use crate::mapblue::io_file::FileSource;
use crate::mapblue::io_geocoder::{Geocoder, DEFAULT_GEOCODER_URL};
use crate::mapblue::io_lookup::{LookupClient, DEFAULT_LOOKUP_URL};
use crate::mapblue::renderer::GeoJsonRenderer;

pub mod config_reader;
pub mod io_common;
pub mod io_file;
pub mod io_geocoder;
pub mod io_geojson;
pub mod io_lookup;
pub mod renderer;

#[derive(Debug, Snafu)]
pub enum MapError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Invalid URL: {url}"))]
    InvalidUrl { url: String },
    #[snafu(display("Request to {url} failed: {source}"))]
    LookupRequest { source: reqwest::Error, url: String },
    #[snafu(display("{url} answered with status {status}"))]
    LookupStatus { url: String, status: u16 },
    #[snafu(display("Malformed block at position {position}: {reason}"))]
    MalformedFeature { position: usize, reason: String },
    #[snafu(display("Address not found: {address}"))]
    AddressNotFound { address: String },
    #[snafu(display("Invalid response from the geocoder: {reason}"))]
    InvalidGeocoderResponse { reason: String },
    #[snafu(display("Invalid bounds {text:?}, expected lat1,lon1,lat2,lon2"))]
    ParsingBounds { text: String },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Session { source: SessionError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type MapResult<T> = Result<T, MapError>;

/// A block as received from a source, with its geometry left untouched.
#[derive(PartialEq, Debug, Clone)]
pub struct FetchedBlock {
    pub demographics: BlockDemographics,
    pub geometry: JSValue,
}

/// Where the blocks of a viewport come from.
pub trait BlockSource {
    fn fetch(&self, bounds: &Bounds) -> MapResult<Vec<FetchedBlock>>;
}

/// Runs a session one event at a time: the session decides, the driver does
/// the fetching and the drawing, and feeds the results back as new events.
pub struct SessionDriver<S: BlockSource> {
    session: MapSession,
    renderer: GeoJsonRenderer,
    source: S,
    geocoder: Option<Geocoder>,
    geocoder_span: (f64, f64),
    // Geometries of fetched blocks that the renderer does not have yet.
    pending_geometries: HashMap<BlockId, JSValue>,
    queue: VecDeque<SessionEvent>,
    reports: Vec<BlockReport>,
}

impl<S: BlockSource> SessionDriver<S> {
    pub fn new(session: MapSession, source: S, viewport: Bounds) -> SessionDriver<S> {
        SessionDriver {
            session,
            renderer: GeoJsonRenderer::new(viewport),
            source,
            geocoder: None,
            geocoder_span: (DEFAULT_LAT_SPAN, DEFAULT_LON_SPAN),
            pending_geometries: HashMap::new(),
            queue: VecDeque::new(),
            reports: Vec::new(),
        }
    }

    pub fn with_geocoder(self, geocoder: Geocoder, span: (f64, f64)) -> SessionDriver<S> {
        SessionDriver {
            geocoder: Some(geocoder),
            geocoder_span: span,
            ..self
        }
    }

    pub fn session(&self) -> &MapSession {
        &self.session
    }

    pub fn renderer(&self) -> &GeoJsonRenderer {
        &self.renderer
    }

    /// The hover reports shown so far.
    pub fn reports(&self) -> &[BlockReport] {
        &self.reports
    }

    /// Moves the map to the given viewport.
    pub fn move_to(&mut self, bounds: Bounds) -> MapResult<()> {
        self.renderer.set_viewport(bounds);
        self.dispatch(SessionEvent::ViewportChanged(self.renderer.viewport_bounds()))
    }

    /// Looks up an address and moves the map there. A failed lookup is
    /// reported to the user and leaves the session as it is.
    pub fn center_on(&mut self, address: &str) -> MapResult<()> {
        let res = match &self.geocoder {
            Some(geocoder) => geocoder.locate(address),
            None => whatever!("no geocoder configured"),
        };
        match res {
            Ok((lat, lon)) => {
                info!("Address {:?} found at ({}, {})", address, lat, lon);
                let (lat_span, lon_span) = self.geocoder_span;
                self.move_to(Bounds::around(lat, lon, lat_span, lon_span))
            }
            Err(e) => {
                warn!("Geocoding {:?} failed: {}", address, e);
                eprintln!("{}", e);
                Ok(())
            }
        }
    }

    /// Applies an event and everything that follows from it, until the
    /// queue is empty.
    pub fn dispatch(&mut self, event: SessionEvent) -> MapResult<()> {
        self.queue.push_back(event);
        while let Some(ev) = self.queue.pop_front() {
            debug!("dispatch: {:?}", ev);
            let effects = self.session.apply(ev).context(SessionSnafu {})?;
            for effect in effects {
                self.perform(effect)?;
            }
        }
        Ok(())
    }

    fn perform(&mut self, effect: Effect) -> MapResult<()> {
        match effect {
            Effect::Fetch(bounds) => {
                let ev = match self.source.fetch(&bounds) {
                    Ok(fetched) => {
                        let mut blocks: Vec<BlockDemographics> = Vec::new();
                        for fb in fetched {
                            if !self.session.contains(&fb.demographics.id) {
                                self.pending_geometries
                                    .insert(fb.demographics.id.clone(), fb.geometry);
                            }
                            blocks.push(fb.demographics);
                        }
                        SessionEvent::FetchCompleted { bounds, blocks }
                    }
                    Err(e) => SessionEvent::FetchFailed {
                        bounds,
                        reason: e.to_string(),
                    },
                };
                self.queue.push_back(ev);
            }
            Effect::AddFeatures(ids) => {
                let features: Vec<(BlockId, JSValue)> = ids
                    .into_iter()
                    .map(|id| {
                        let geometry = self
                            .pending_geometries
                            .remove(&id)
                            .unwrap_or(JSValue::Null);
                        (id, geometry)
                    })
                    .collect();
                self.renderer.add_features(features);
            }
            Effect::ClearFeatures => {
                self.renderer.clear_features();
                self.pending_geometries.clear();
            }
            Effect::Restyle(ids) => {
                self.session
                    .paint(&mut self.renderer, &ids)
                    .context(SessionSnafu {})?;
            }
            Effect::RestyleAll => {
                self.session
                    .paint_all(&mut self.renderer)
                    .context(SessionSnafu {})?;
            }
            Effect::ShowReport(report) => {
                info!("Hovering over block {}", report.id);
                println!("{}", report);
                self.reports.push(report);
            }
        }
        Ok(())
    }

    /// Replays one step of a session file.
    pub fn run_step(&mut self, step: &SessionStep) -> MapResult<()> {
        match step {
            SessionStep::Viewport {
                lat1,
                lon1,
                lat2,
                lon2,
            } => self.move_to(Bounds {
                lat1: *lat1,
                lon1: *lon1,
                lat2: *lat2,
                lon2: *lon2,
            }),
            SessionStep::Click { id } => {
                let id = step_block_id(id)?;
                self.dispatch(SessionEvent::FeatureClicked(id))
            }
            SessionStep::Hover { id } => {
                let id = step_block_id(id)?;
                self.dispatch(SessionEvent::FeatureHovered(id))
            }
            SessionStep::Coefficients(c) => {
                let coefficients = c.apply_to(self.session.coefficients());
                self.dispatch(SessionEvent::CoefficientsChanged(coefficients))
            }
            SessionStep::Geocode { address } => self.center_on(address.as_str()),
            SessionStep::Reload => {
                let bounds = self.renderer.viewport_bounds();
                self.dispatch(SessionEvent::Reload(bounds))
            }
        }
    }
}

fn step_block_id(js: &JSValue) -> MapResult<BlockId> {
    match block_id_from_js(js) {
        Some(id) => Ok(id),
        None => whatever!("invalid block id in session step: {}", js),
    }
}

/// The totals of a session, in JSON form.
pub fn build_summary_js(session: &MapSession) -> JSValue {
    let c = session.coefficients();
    let t = session.totals();
    let mut selected: Vec<String> = session
        .selected_ids()
        .iter()
        .map(|id| id.to_string())
        .collect();
    selected.sort();
    json!({
        "coefficients": {
            "black": c.black,
            "hispanic": c.hispanic,
            "otherRace": c.other_race,
            "unmarried": c.unmarried,
            "childless": c.childless,
            "constant": c.constant,
        },
        "blocks": session.len(),
        "totalVoters": t.total_voters,
        "demVoters": t.dem_voters,
        "repVoters": t.rep_voters,
        "maxDemVoters": t.max_dem_voters,
        "maxRepVoters": t.max_rep_voters,
        "selectedVotes": t.selected_votes,
        "selected": selected,
    })
}

/// Compares a summary with a reference summary, printing the differences.
pub fn check_summary(summary: &JSValue, reference: &JSValue) -> MapResult<()> {
    let pretty_summary = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    let pretty_reference = serde_json::to_string_pretty(reference).context(ParsingJsonSnafu {})?;
    if pretty_reference != pretty_summary {
        warn!("Found differences with the reference summary");
        print_diff(pretty_reference.as_str(), pretty_summary.as_str(), "\n");
        whatever!("Difference detected between computed summary and reference summary")
    }
    Ok(())
}

fn merge_args(config: &mut SessionConfig, args: &Args) -> MapResult<()> {
    if let Some(url) = &args.lookup_url {
        config.lookup = Some(LookupConfig { url: url.clone() });
    }
    let overrides = CoefficientsConfig {
        black: args.black_coeff,
        hispanic: args.hispanic_coeff,
        other_race: args.other_race_coeff,
        unmarried: args.unmarried_coeff,
        childless: args.childless_coeff,
        constant: args.regression_constant,
    };
    if !overrides.is_empty() {
        let coefficients = overrides.apply_to(&config.coefficients());
        config.coefficients = Some(CoefficientsConfig {
            black: Some(coefficients.black),
            hispanic: Some(coefficients.hispanic),
            other_race: Some(coefficients.other_race),
            unmarried: Some(coefficients.unmarried),
            childless: Some(coefficients.childless),
            constant: Some(coefficients.constant),
        });
    }
    let mut style = config.style.clone().unwrap_or_default();
    if let Some(mode) = &args.opacity_mode {
        read_opacity_mode(mode.as_str())?;
        style.opacity_mode = Some(mode.clone());
    }
    if let Some(min_opacity) = args.min_opacity {
        style.min_opacity = Some(min_opacity);
    }
    config.style = Some(style);
    Ok(())
}

/// Replays the steps of the session file, then the viewports and selections
/// given on the command line. Without any of them, the initial viewport is
/// loaded.
pub fn replay<S: BlockSource>(
    driver: &mut SessionDriver<S>,
    config: &SessionConfig,
    args: &Args,
) -> MapResult<()> {
    let steps = config.steps.clone().unwrap_or_default();
    let mut moved = steps.iter().any(|s| {
        matches!(
            s,
            SessionStep::Viewport { .. } | SessionStep::Geocode { .. } | SessionStep::Reload
        )
    });
    if !moved && args.bounds.is_none() && args.address.is_none() {
        driver.move_to(config.initial_viewport())?;
        moved = true;
    }
    debug!("replay: initial viewport loaded: {}", moved);
    for step in steps.iter() {
        driver.run_step(step)?;
    }
    if let Some(address) = &args.address {
        driver.center_on(address.as_str())?;
    }
    for text in args.bounds.clone().unwrap_or_default() {
        driver.move_to(parse_bounds(text.as_str())?)?;
    }
    // Selecting is not toggling: a block listed twice stays selected.
    for id in args.select.clone().unwrap_or_default() {
        let id = BlockId(id);
        if !driver.session().is_selected(&id).context(SessionSnafu {})? {
            driver.dispatch(SessionEvent::FeatureClicked(id))?;
        }
    }
    Ok(())
}

fn finish<S: BlockSource>(driver: &SessionDriver<S>, args: &Args) -> MapResult<()> {
    let session = driver.session();
    let t = session.totals();
    info!(
        "Session: {} blocks, {} voters, {} dem, {} rep, {} selected votes",
        session.len(),
        t.total_voters,
        t.dem_voters,
        t.rep_voters,
        t.selected_votes
    );

    if let Some(out_path) = &args.out {
        let js = driver.renderer().to_geojson(session)?;
        let pretty = serde_json::to_string_pretty(&js).context(ParsingJsonSnafu {})?;
        write_output(out_path.as_str(), pretty.as_str())?;
    }

    let summary = build_summary_js(session);
    let pretty_summary = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
    match &args.summary {
        Some(path) => write_output(path.as_str(), pretty_summary.as_str())?,
        None => println!("summary:{}", pretty_summary),
    }

    // The reference summary, if provided for comparison
    if let Some(reference_path) = &args.reference {
        let reference = read_summary(reference_path.as_str())?;
        info!("reference summary: {:?}", reference);
        check_summary(&summary, &reference)?;
    }
    Ok(())
}

fn run_with_source<S: BlockSource>(source: S, config: &SessionConfig, args: &Args) -> MapResult<()> {
    let rules = config.style.clone().unwrap_or_default().rules()?;
    let session = MapSession::with_rules(&config.coefficients(), rules);
    let mut driver = SessionDriver::new(session, source, config.initial_viewport());

    let uses_geocoder = args.address.is_some()
        || config
            .steps
            .iter()
            .flatten()
            .any(|s| matches!(s, SessionStep::Geocode { .. }));
    if uses_geocoder {
        let url = config
            .geocoder
            .as_ref()
            .and_then(|g| g.url.clone())
            .unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string());
        driver = driver.with_geocoder(Geocoder::new(url.as_str())?, config.geocoder_span());
    }

    replay(&mut driver, config, args)?;
    finish(&driver, args)
}

pub fn run_session(args: &Args) -> MapResult<()> {
    let mut config = match &args.config {
        Some(path) => read_config(path.as_str())?,
        None => SessionConfig::default(),
    };
    merge_args(&mut config, args)?;
    info!("config: {:?}", config);

    match &args.input {
        Some(path) => run_with_source(FileSource::open(path.as_str())?, &config, args),
        None => {
            let url = config
                .lookup
                .as_ref()
                .map(|l| l.url.clone())
                .unwrap_or_else(|| DEFAULT_LOOKUP_URL.to_string());
            run_with_source(LookupClient::new(url.as_str())?, &config, args)
        }
    }
}
