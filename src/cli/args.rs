use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "traversal-probe",
    version,
    about = "path-traversal probing tool",
    long_about = "traversal-probe substitutes generated ../ payloads into a URL template and reports responses that leak a Unix password file.\n\nExamples:\n  traversal-probe -u 'https://target.tld/img.php?file=FUZZ'\n  traversal-probe -u 'https://target.tld/img.php?file=FUZZ' --os all -d 8 --fs 800\n  traversal-probe -u 'https://target.tld/img.php?file=FUZZ' --config ~/.traversal-probe/config.yml\n\nTip: Use --config to persist scan settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        long = "hc",
        visible_alias = "hide-content",
        help_heading = "Output",
        help = "Only print the status line of each hit, not the leaked body."
    )]
    pub hide_content: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write hits to a file."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format (text or json)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'u',
        long = "u",
        visible_alias = "url",
        value_name = "URL",
        help_heading = "Input",
        help = "Target URL template containing the placeholder (e.g. https://host/img.php?file=FUZZ)."
    )]
    pub url: Option<String>,

    #[arg(
        short = 'P',
        long = "ph",
        visible_alias = "placeholder",
        value_name = "TOKEN",
        help_heading = "Input",
        help = "Placeholder token replaced by each payload (default FUZZ)."
    )]
    pub placeholder: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Input",
        help = "Write a default config to ~/.traversal-probe/config.yml and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'O',
        long = "os",
        value_name = "OS",
        help_heading = "Traversal",
        help = "Target OS family for the default file list (linux, windows, anything else = both)."
    )]
    pub os: Option<String>,

    #[arg(
        short = 'd',
        long = "md",
        visible_aliases = ["max-depth", "depth"],
        value_name = "N",
        help_heading = "Traversal",
        help = "Maximum number of ../ segments."
    )]
    pub max_depth: Option<usize>,

    #[arg(
        short = 'f',
        long = "fl",
        visible_alias = "file",
        value_name = "PATH",
        help_heading = "Traversal",
        help = "Custom target file, replaces the OS default list (e.g. /etc/passwd)."
    )]
    pub file: Option<String>,

    #[arg(
        short = 'L',
        long = "lp",
        visible_alias = "list-payloads",
        help_heading = "Traversal",
        help = "Print the generated payloads and exit without sending requests."
    )]
    pub list_payloads: bool,

    #[arg(
        long = "fc",
        visible_alias = "filter-status",
        value_name = "CODES",
        help_heading = "Filters",
        help = "Status code patterns, comma-separated; '*' any digits, '?' optional digit (default 200)."
    )]
    pub filter_status: Option<String>,

    #[arg(
        long = "fs",
        visible_alias = "filter-size",
        value_name = "BYTES",
        help_heading = "Filters",
        help = "Minimum body size in bytes; only the first comma-separated entry is used."
    )]
    pub filter_size: Option<String>,

    #[arg(
        short = 't',
        long = "cnc",
        visible_alias = "concurrency",
        value_name = "N",
        help_heading = "Performance",
        help = "Max in-flight requests (0 = all payloads at once)."
    )]
    pub concurrency: Option<usize>,

    #[arg(
        short = 'w',
        long = "wrk",
        visible_alias = "workers",
        value_name = "N",
        help_heading = "Performance",
        help = "Number of runtime worker threads."
    )]
    pub workers: Option<usize>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Per-request timeout in seconds (0 = client default)."
    )]
    pub timeout: Option<usize>,

    #[arg(
        long = "nfr",
        visible_alias = "no-follow-redirects",
        help_heading = "HTTP",
        help = "Do not follow HTTP redirects."
    )]
    pub no_follow_redirects: bool,
}
