//! Route command implementation.

use crate::cli::RouteArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use covenant_extractor::{CatalogueFileSource, TopicRouter};

/// Execute the route command.
pub fn execute_route(args: RouteArgs, formatter: &Formatter) -> Result<()> {
    if args.question.trim().is_empty() {
        return Err(CliError::InvalidInput("Question must not be empty".to_string()));
    }

    let router = TopicRouter::new(CatalogueFileSource::new(&args.questions));
    let route = router.route(&args.question)?;
    println!("{}", formatter.format_route(&args.question, &route)?);
    Ok(())
}
