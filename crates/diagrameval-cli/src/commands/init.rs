//! The `diagrameval init` command.

use std::path::Path;

use anyhow::Result;

use diagrameval_batch::config::STARTER_CONFIG;

pub fn execute() -> Result<()> {
    if Path::new("diagrameval.toml").exists() {
        println!("diagrameval.toml already exists, skipping.");
    } else {
        std::fs::write("diagrameval.toml", STARTER_CONFIG)?;
        println!("Created diagrameval.toml");
    }

    for dir in ["data", "prompts", "schemas"] {
        if Path::new(dir).is_dir() {
            println!("{dir}/ already exists, skipping.");
        } else {
            std::fs::create_dir_all(dir)?;
            println!("Created {dir}/");
        }
    }

    println!("\nNext steps:");
    println!("  1. Put coded rows in data/rows.json and reference templates in data/templates.json");
    println!("  2. Add prompt files to prompts/ and response schemas to schemas/");
    println!("  3. Run: diagrameval explore");
    println!("  4. Run: diagrameval prepare --setting <name> --model <model>");

    Ok(())
}
