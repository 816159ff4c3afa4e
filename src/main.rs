use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use imfilter::{FilterCall, Orientation, SortBy, Value, Volume, VolumeLoader, catalog, volume_loader};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one filter on an image and write its outputs
    Run(RunArgs),
    /// Print the operation catalog as JSON
    List,
}

#[derive(Args)]
struct RunArgs {
    /// Filter name, short (`median`) or canonical (`MedianImageFilter`)
    filter: String,
    /// DICOM directory, raw volume (.json/.raw) or 2D raster image
    input: PathBuf,
    /// Named parameter as NAME=VALUE; VALUE is parsed as JSON when possible
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,
    /// JSON object with further named parameters
    #[arg(long = "params", value_name = "FILE")]
    params_file: Option<PathBuf>,
    /// Number of outputs to write
    #[arg(long)]
    nargout: Option<usize>,
    /// Prefix of the written files; outputs land at <PREFIX>_<NAME>.{json,raw}
    #[arg(short, long, default_value = "out")]
    output: PathBuf,
    /// Slice ordering for DICOM series
    #[arg(long, default_value = "image-position-patient")]
    sort_by: SortBy,
    /// Also write a PNG of the central slice of 3D outputs in this
    /// orientation (axial, coronal or sagittal); 2D outputs always get one
    #[arg(long, value_name = "ORIENTATION")]
    preview: Option<Orientation>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_filter(&args)?,
        Commands::List => {
            println!("{}", serde_json::to_string_pretty(&catalog::schemas())?);
        }
    }

    Ok(())
}

fn run_filter(args: &RunArgs) -> Result<()> {
    let input = &args.input;
    let volume = VolumeLoader::load(input, args.sort_by)
        .wrap_err_with(|| format!("failed to load {}", input.display()))?;
    info!(input = %input.display(), shape = ?volume.dim(), element_type = %volume.data.element_type(), "input loaded");

    let mut call = FilterCall::new(&args.filter, volume.clone());
    if let Some(path) = &args.params_file {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let json: serde_json::Value = serde_json::from_str(&text)?;
        let object = json
            .as_object()
            .ok_or_else(|| eyre!("{} must hold a JSON object", path.display()))?;
        for (name, value) in object {
            call = call.named(name, Value::from_json(name, value)?);
        }
    }
    for param in &args.params {
        let (name, raw) = param
            .split_once('=')
            .ok_or_else(|| eyre!("parameter `{param}` is not of the form NAME=VALUE"))?;
        call = call.named(name, parse_value(name, raw)?);
    }
    if let Some(nargout) = args.nargout {
        call = call.nargout(nargout);
    }

    for out in call.run()? {
        let result = if out.data.shape() == volume.dim() {
            volume.with_data(out.data)?
        } else {
            Volume::from_array(out.data)
        };
        let prefix = output_path(&args.output, out.name);
        VolumeLoader::save_raw(&prefix, &result)?;
        let orientation = match (result.data.ndim(), args.preview) {
            (2, orientation) => Some(orientation.unwrap_or(Orientation::Axial)),
            (3, orientation) => orientation,
            _ => None,
        };
        if let Some(orientation) = orientation {
            VolumeLoader::save_preview(volume_loader::sibling(&prefix, "png"), &result, orientation)?;
        }
        info!(output = out.name, path = %prefix.display(), "output written");
    }

    Ok(())
}

fn parse_value(name: &str, raw: &str) -> Result<Value> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Ok(Value::from_json(name, &json)?),
        Err(_) => Ok(Value::from(raw)),
    }
}

fn output_path(prefix: &Path, name: &str) -> PathBuf {
    let mut file_name = prefix.file_name().map(OsString::from).unwrap_or_default();
    file_name.push(format!("_{name}"));
    prefix.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_prefixes_give_one_file_per_output() {
        let prefix = Path::new("runs/res.v1");
        let b = volume_loader::sibling(&output_path(prefix, "B"), "json");
        let c = volume_loader::sibling(&output_path(prefix, "C"), "json");
        assert_eq!(b, Path::new("runs/res.v1_B.json"));
        assert_eq!(c, Path::new("runs/res.v1_C.json"));
        assert_eq!(
            volume_loader::sibling(&output_path(prefix, "B"), "png"),
            Path::new("runs/res.v1_B.png")
        );
    }

    #[test]
    fn cli_accepts_preview_orientations() {
        let cli = Cli::try_parse_from(["imfilter", "run", "median", "ct", "--preview", "coronal"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected the run subcommand");
        };
        assert_eq!(args.preview, Some(Orientation::Coronal));
        assert_eq!(args.sort_by, SortBy::ImagePositionPatient);
    }
}
