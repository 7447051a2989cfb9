use clap::{Parser, Subcommand};

use crate::client::exports::ExportKind;

/// A command line client for the data entry and batch import pages of a tally server.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON configuration file. See the manual of tally_entry for
    /// the format. All the settings are optional and the flags below override them.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (URL) The base URL of the tally server. Overrides server.baseUrl.
    #[clap(long, value_parser)]
    pub server: Option<String>,

    /// The CSRF token sent with every request. Overrides server.csrfToken.
    #[clap(long, value_parser)]
    pub csrf_token: Option<String>,

    /// The id of the tally. Overrides tallyId.
    #[clap(long, value_parser)]
    pub tally_id: Option<u64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Runs a batch import on the server, step by step, until it completes or fails.
    Import {
        /// (default 5) The number of steps of the import.
        #[clap(long, value_parser)]
        total_steps: Option<u32>,
        /// (list of comma-separated numbers) The known totals of the first steps.
        #[clap(long, value_parser, value_delimiter = ',')]
        totals: Option<Vec<u64>>,
        /// (list of comma-separated numbers) Resumes the first steps from these offsets.
        #[clap(long, value_parser, value_delimiter = ',')]
        offsets: Option<Vec<u64>>,
        /// (default 30000) Milliseconds between two polls of a background task.
        #[clap(long, value_parser)]
        poll_delay_ms: Option<u64>,
        /// (default unlimited) Gives up on a background task after this many polls.
        #[clap(long, value_parser)]
        max_task_polls: Option<u32>,
        /// (default 0) Sends a request again this many times when the server cannot be reached.
        #[clap(long, value_parser)]
        network_retries: Option<u32>,
    },
    /// Lists the stations of the given centers.
    CentersStations {
        #[clap(value_parser)]
        center_ids: Vec<u64>,
    },
    /// Lists the constituencies and sub-constituencies of the given regions.
    Regions {
        #[clap(value_parser)]
        region_names: Vec<String>,
    },
    /// Downloads an export: result_forms, form_results, candidates_list,
    /// centers_and_stations_list, offices_list, regions_list or results_presentation.
    Export {
        #[clap(value_parser)]
        kind: ExportKind,
        /// (JSON object) Filters added to the request, for example '{"region_names": ["North"]}'.
        #[clap(long, value_parser)]
        filters: Option<String>,
        /// (default .) The directory where the export is written.
        #[clap(short, long, value_parser)]
        out_dir: Option<String>,
    },
    /// Tells the server that a cover was printed.
    Printed {
        /// (URL or route) The "set as printed" address of the cover.
        #[clap(value_parser)]
        url: Option<String>,
    },
    /// Replays a JSON script of form events through the barcode entry logic and prints the
    /// final state of the form.
    ReplayBarcode {
        #[clap(value_parser)]
        script: String,
    },
    /// Checks that the center and station numbers were entered twice identically.
    VerifyCenter {
        #[clap(value_parser)]
        center_number: String,
        #[clap(value_parser)]
        center_number_copy: String,
        #[clap(value_parser)]
        station_number: String,
        #[clap(value_parser)]
        station_number_copy: String,
    },
}
