//! Questions command implementation.

use crate::cli::QuestionsArgs;
use crate::error::Result;
use crate::output::Formatter;
use covenant_extractor::CatalogueDirectory;

/// Execute the questions command.
pub fn execute_questions(args: QuestionsArgs, formatter: &Formatter) -> Result<()> {
    let catalogue = CatalogueDirectory::from_file(&args.questions)?;
    println!("{}", formatter.format_questions(&catalogue)?);
    Ok(())
}
