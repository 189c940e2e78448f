//! `kiln names` command

use anyhow::Result;

use crate::cli::NamesArgs;
use kiln::create_template_names;

pub fn execute(args: NamesArgs) -> Result<()> {
    for name in create_template_names(&args.name).to_vec() {
        println!("{}", name);
    }
    Ok(())
}
