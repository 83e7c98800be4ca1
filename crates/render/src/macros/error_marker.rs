//! Blocks that stand in for a failed macro call.

use crate::error::MacroError;
use std::error::Error;
use wikiflow_core::{Block, BlockKind, Format};

/// Class of the block carrying the error message.
pub const ERROR_CLASS: &str = "wikiflow-error";
/// Class of the block carrying the cause chain.
pub const ERROR_DESCRIPTION_CLASS: &str = "wikiflow-error-description hidden";

/// Builds the error marker for `error`.
///
/// Standalone calls get a group with the message followed by a group with
/// the cause chain; inline calls get the same content as `Format::None`
/// spans.
pub fn error_blocks(error: &MacroError, inline: bool, with_description: bool) -> Vec<Block> {
    let message = error.to_string();
    let description = with_description.then(|| describe(error));
    if inline {
        let mut blocks = vec![
            Block::format(Format::None, Block::text(&message)).with_parameter("class", ERROR_CLASS),
        ];
        if let Some(description) = description {
            blocks.push(
                Block::format(
                    Format::None,
                    vec![Block::new(BlockKind::VerbatimInline(description))],
                )
                .with_parameter("class", ERROR_DESCRIPTION_CLASS),
            );
        }
        blocks
    } else {
        let mut blocks = vec![
            Block::group(vec![Block::paragraph(Block::text(&message))])
                .with_parameter("class", ERROR_CLASS),
        ];
        if let Some(description) = description {
            blocks.push(
                Block::group(vec![Block::new(BlockKind::VerbatimStandalone(description))])
                    .with_parameter("class", ERROR_DESCRIPTION_CLASS),
            );
        }
        blocks
    }
}

fn describe(error: &MacroError) -> String {
    let mut description = error.to_string();
    let mut cause = error.source();
    while let Some(current) = cause {
        description.push_str("\nCaused by: ");
        description.push_str(&current.to_string());
        cause = current.source();
    }
    description
}
