use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Edit one or two clips according to a text prompt
    Render {
        /// Primary video clip
        #[arg(long)]
        video1: PathBuf,

        /// Optional second clip, appended after the first
        #[arg(long)]
        video2: Option<PathBuf>,

        /// Editing instructions, e.g. "cinematic, add title: Hello at 0:02"
        #[arg(short, long, default_value = "")]
        prompt: String,

        /// Output file
        #[arg(short, long, conflicts_with = "output_dir")]
        output: Option<PathBuf>,

        /// Directory for the generated output file
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Show how a prompt is interpreted without processing any media
    Intent {
        /// Editing instructions
        #[arg(short, long)]
        prompt: String,
    },

    /// Verify ffmpeg, ffprobe and the transcriber are runnable
    Check,

    /// Write the default configuration file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "promptcut.toml")]
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_arguments() {
        let args = Args::try_parse_from([
            "promptcut", "-v", "render", "--video1", "a.mp4", "--video2", "b.mov", "--prompt", "warm",
        ])
        .unwrap();

        assert!(args.verbose);
        match args.command {
            Commands::Render { video1, video2, prompt, output, output_dir } => {
                assert_eq!(video1, PathBuf::from("a.mp4"));
                assert_eq!(video2, Some(PathBuf::from("b.mov")));
                assert_eq!(prompt, "warm");
                assert!(output.is_none() && output_dir.is_none());
            }
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn test_output_and_output_dir_conflict() {
        let result = Args::try_parse_from([
            "promptcut", "render", "--video1", "a.mp4", "--output", "x.mp4", "--output-dir", "out",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_render_requires_video1() {
        assert!(Args::try_parse_from(["promptcut", "render", "--prompt", "warm"]).is_err());
    }
}
