use clap::Parser;

/// Computes partisan-lean estimates over census blocks, the way a map viewer would.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The file describing the session in JSON format: lookup service,
    /// coefficients, styling and the sequence of map actions to replay.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, optional) A local GeoJSON FeatureCollection to serve the blocks from,
    /// instead of querying the lookup service.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (URL) The lookup service. Overrides the URL set in the --config file.
    #[clap(long, value_parser)]
    pub lookup_url: Option<String>,

    /// (lat1,lon1,lat2,lon2) A viewport to load, north-east corner first. Can be repeated.
    /// The viewports are loaded after the steps of the --config file.
    #[clap(short, long, value_parser)]
    pub bounds: Option<Vec<String>>,

    /// (text) An address to center the map on before loading the viewports.
    #[clap(long, value_parser)]
    pub address: Option<String>,

    /// (block id) A block to select once all the viewports are loaded. Can be repeated;
    /// a block listed more than once stays selected.
    #[clap(short, long, value_parser)]
    pub select: Option<Vec<String>>,

    /// (share or count, default share) Where the opacity of the blocks comes from.
    #[clap(long, value_parser)]
    pub opacity_mode: Option<String>,

    /// (number between 0 and 1, default 0.15) The smallest opacity of a block.
    #[clap(long, value_parser)]
    pub min_opacity: Option<f64>,

    // Regression coefficients
    #[clap(long, value_parser)]
    pub black_coeff: Option<f64>,
    #[clap(long, value_parser)]
    pub hispanic_coeff: Option<f64>,
    #[clap(long, value_parser)]
    pub other_race_coeff: Option<f64>,
    #[clap(long, value_parser)]
    pub unmarried_coeff: Option<f64>,
    #[clap(long, value_parser)]
    pub childless_coeff: Option<f64>,
    #[clap(long, value_parser)]
    pub regression_constant: Option<f64>,

    /// (file path, 'stdout' or empty) If specified, the styled blocks will be written as a GeoJSON
    /// FeatureCollection to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the totals of the session will be written in
    /// JSON format to the given location.
    #[clap(long, value_parser)]
    pub summary: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, mapblue will check that
    /// the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
