use anyhow::Result;
use tracing::info;

use crate::cli::PromptArgs;
use crate::extract::{ParseOptions, RollParser};
use crate::util::read_text;

/// Prints the recovery prompt for one page on stdout so it can be sent to the
/// external model; the saved answer goes back in through `merge`.
pub fn run(args: PromptArgs) -> Result<()> {
    let page_text = read_text(&args.input)?;

    let candidate_ids = if args.candidate_ids.is_empty() {
        let parser = RollParser::new()?;
        let options = ParseOptions {
            house_number_mode: args.category.house_number_mode(),
        };
        let voters = parser.parse_voters_from_text(&page_text, &options);
        args.category.candidate_ids(&voters)
    } else {
        args.candidate_ids.clone()
    };

    info!(
        input = %args.input.display(),
        category = args.category.as_str(),
        candidates = candidate_ids.len(),
        "built recovery prompt"
    );

    println!("{}", args.category.build_prompt(&page_text, &candidate_ids));

    Ok(())
}
