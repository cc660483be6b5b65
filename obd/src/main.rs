use std::fs;

use color_eyre::eyre::{Context, Result, bail, eyre};
use log::{LevelFilter, info};
use obd::{
  cli::{Cli, Commands},
  render::{LookupData, render_site},
};
use obd_config::Config;
use obd_usfm::{
  BookCode,
  LanguageTables,
  LinkMode,
  reference::ParseContext,
  parse_reference,
  reference_href,
};

fn main() -> Result<()> {
  color_eyre::install()?;

  // Parse command line arguments
  let cli = Cli::parse_args();

  // Initialize logging first so we can log during command handling
  env_logger::Builder::new()
    .filter_level(if cli.verbose {
      LevelFilter::Debug
    } else {
      LevelFilter::Info
    })
    .write_style(env_logger::WriteStyle::Always)
    .init();

  match &cli.command {
    Commands::Init {
      output,
      format,
      force,
    } => {
      // Check if file already exists and that we're not forcing overwrite
      if output.exists() && !force {
        bail!(
          "Configuration file already exists: {}. Use --force to overwrite.",
          output.display()
        );
      }

      // Create parent directories if needed
      if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
      {
        fs::create_dir_all(parent).wrap_err_with(|| {
          format!("Failed to create directory: {}", parent.display())
        })?;
        info!("Created directory: {}", parent.display());
      }

      Config::generate_default_config(format, output).wrap_err_with(|| {
        format!(
          "Failed to generate configuration file: {}",
          output.display()
        )
      })?;
      Ok(())
    },

    Commands::CheckTables => {
      let tables =
        LanguageTables::load().wrap_err("Word substitution tables invalid")?;
      info!(
        "{}: {} entries, {}: {} entries",
        tables.english.name(),
        tables.english.len(),
        tables.german.name(),
        tables.german.len()
      );
      Ok(())
    },

    Commands::Resolve {
      reference,
      book,
      version,
      mode,
      level,
    } => {
      let config = Config::load(&cli.config_files, &cli.config_overrides)?;
      let data = LookupData::load(&config)?;
      let home_book: BookCode = book.parse().map_err(|e| eyre!("{e}"))?;
      let ctx = ParseContext {
        version,
        home_book: &home_book,
        lookups: data.lookups(),
      };
      let range = parse_reference(reference, &ctx, None)
        .wrap_err_with(|| format!("Failed to resolve '{reference}'"))?;
      let mode = match mode.as_str() {
        "book" => LinkMode::Book,
        "verse" => LinkMode::Verse,
        "section" => LinkMode::Section,
        _ => LinkMode::Chapter,
      };
      let href =
        reference_href(&range.start, mode, version, *level, &data.sections)?;

      #[allow(clippy::print_stdout, reason = "Command output")]
      {
        println!("{range}\t{href}");
      }
      Ok(())
    },

    Commands::Render {
      input,
      output,
      jobs,
    } => {
      let mut config =
        Config::load(&cli.config_files, &cli.config_overrides)?;

      // Command line flags win over configuration files
      if let Some(input) = input {
        config.input_dir = Some(input.clone());
      }
      if let Some(output) = output {
        config.output_dir.clone_from(output);
      }
      if jobs.is_some() {
        config.jobs = *jobs;
      }
      config.validate()?;
      config.validate_paths()?;

      let Some(ref input) = config.input_dir else {
        bail!("No input given. Use --input or set input_dir.");
      };
      info!("Output directory: {}", config.output_dir.display());
      render_site(&config, input, &config.output_dir)?;
      Ok(())
    },
  }
}
