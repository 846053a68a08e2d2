use std::io::{BufRead, Write};

use anyhow::Result;
use polars::prelude::DataFrame;

use crate::filters::confirm;

pub const PAGE_SIZE: usize = 5;

const END_OF_DATA: &str = "You have reached the end of the dataset!";

/// Walk the raw rows five at a time, one batch per affirmative answer.
/// The window always advances from the start; any other answer exits.
pub fn page_raw_data<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    df: &DataFrame,
) -> Result<()> {
    let total = df.height();
    let mut shown = 0usize;
    loop {
        if !confirm(input, output, "\nWould you like to see 5 rows of raw data? (yes/no)")? {
            break;
        }
        if shown >= total {
            writeln!(output, "{}", END_OF_DATA)?;
            break;
        }
        let batch = df.slice(shown as i64, PAGE_SIZE);
        writeln!(output, "{}", batch)?;
        shown += batch.height();
        if shown >= total {
            writeln!(output, "{}", END_OF_DATA)?;
            break;
        }
    }
    Ok(())
}
