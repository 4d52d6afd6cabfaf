use clap::Parser;
use kbscraper::fetch::build_detail_url;

/// Prints the detail-page URL for each article id.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Article ids (GUIDs without braces)
    #[arg(required = true)]
    ids: Vec<String>,
}

fn main() {
    let args = Args::parse();
    for id in &args.ids {
        println!("{}\t{}", id, build_detail_url(id));
    }
}
