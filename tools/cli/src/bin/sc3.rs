use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use miette::Report;
use sc3_assets::{sanitize_rel_path, DirectoryStorage, LnkArchive, LnkMediaStorage};
use sc3_engine::storage::script_id_hex;
use sc3_engine::version::TRACE_FORMAT_VERSION;
use sc3_engine::{
    ChoicePolicy, ConfigError, Domain, EngineConfig, FormatOptions, Game, Interpreter,
    MediaStorage, ParseOptions, PlaybackTrace, RecordingFrontend, RuntimeOptions, SaveData,
    ScriptFile, TokenFormatter, VnError,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about = "Ever17 / Never7 SC3 script tools")]
struct Cli {
    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Log more; repeat for more detail.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// TOML config with runtime, format and media sections.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Tokenize and dump script files or LNK archives.
    Dump(DumpArgs),
    /// Play a game headlessly and write a YAML trace of front-end calls.
    Play(PlayArgs),
    /// List or extract the entries of an LNK archive.
    Lnk {
        archive: PathBuf,
        #[arg(long, value_name = "DIR")]
        extract: Option<PathBuf>,
    },
    /// Check that a save belongs to a script file.
    VerifySave {
        save: PathBuf,
        #[arg(long)]
        script: PathBuf,
    },
}

#[derive(Args, Default)]
struct DumpArgs {
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Tokenize event (top-level script) chunks. Default when -c is not given.
    #[arg(short = 's', long = "tok-script")]
    events: bool,
    /// Tokenize conversation chunks.
    #[arg(short = 'c', long = "tok-cl")]
    convs: bool,
    /// Dump every token.
    #[arg(long)]
    tokens: bool,
    /// Append the raw bytes of each token.
    #[arg(long)]
    raw: bool,
    /// Prefix token rows with their offsets.
    #[arg(long)]
    offsets: bool,
    /// Colour tokens with ANSI escapes.
    #[arg(long)]
    color: bool,
    /// Token type frequencies.
    #[arg(long)]
    ttf: bool,
    /// Token type follow frequencies.
    #[arg(long)]
    ttff: bool,
    /// Element length frequencies.
    #[arg(long)]
    elf: bool,
    /// Element start frequencies over the first N bytes.
    #[arg(long, value_name = "N")]
    esflen: Option<usize>,
    /// Frequencies of the last N tokens before a tokenizer failure.
    #[arg(long, value_name = "N")]
    pre_error_len: Option<usize>,
    /// Dump every element of length N.
    #[arg(long, value_name = "N")]
    debl: Option<usize>,
    /// Keep going after a chunk fails to tokenize.
    #[arg(long)]
    cont_on_tok_failure: bool,
    /// Write the event callgraph as DOT.
    #[arg(long, value_name = "PATH")]
    callgraph: Option<PathBuf>,
    /// Write each parsed script back out as `<name>.rewrite`.
    #[arg(short = 'w', long)]
    rewrite: bool,
    #[arg(long, value_name = "DIR", default_value = ".")]
    rewrite_dir: PathBuf,
    /// Inputs are LNK archives instead of split script files.
    #[arg(long)]
    lnk: bool,
    #[arg(long)]
    game: Option<Game>,
    /// Write the dump here instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct PlayArgs {
    /// Game directory: extracted archive directories, or `.dat` archives with --lnk.
    dir: PathBuf,
    #[arg(long)]
    lnk: bool,
    #[arg(long, default_value_t = 200)]
    steps: u32,
    #[arg(long)]
    seed: Option<u64>,
    /// Script to start from.
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    game: Option<Game>,
    /// Stop at the first unprocessable token.
    #[arg(long)]
    strict: bool,
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Save the final position here.
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,
}

#[derive(Serialize)]
struct TraceEnvelope {
    trace_format_version: u16,
    game: Game,
    start_script: String,
    trace: PlaybackTrace,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(quiet: bool, verbose: u8) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn report_error(err: anyhow::Error) {
    match err.downcast::<VnError>() {
        Ok(err) => eprintln!("{:?}", Report::new(err)),
        Err(err) => match err.downcast::<ConfigError>() {
            Ok(err) => eprintln!("{:?}", Report::new(err)),
            Err(err) => eprintln!("error: {err:#}"),
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    match cli.command {
        Command::Dump(args) => {
            let mut sink: Box<dyn Write> = match &args.output {
                Some(path) => Box::new(
                    fs::File::create(path).with_context(|| format!("create {}", path.display()))?,
                ),
                None => Box::new(io::stdout().lock()),
            };
            let failed = dump(&args, &config, &mut sink)?;
            sink.flush()?;
            if failed > 0 {
                anyhow::bail!("{failed} script file(s) failed");
            }
            Ok(())
        }
        Command::Play(args) => play(&args, &config),
        Command::Lnk { archive, extract } => lnk(&archive, extract.as_deref()),
        Command::VerifySave { save, script } => verify_save(&save, &script, &config),
    }
}

impl DumpArgs {
    fn format_options(&self, base: &FormatOptions) -> FormatOptions {
        FormatOptions {
            dump_tokens: base.dump_tokens || self.tokens,
            raw: base.raw || self.raw,
            offsets: base.offsets || self.offsets,
            color: base.color || self.color,
            token_frequency: base.token_frequency || self.ttf,
            follow_frequency: base.follow_frequency || self.ttff,
            element_lengths: base.element_lengths || self.elf,
            element_start_len: self.esflen.or(base.element_start_len),
            pre_error_len: self.pre_error_len.or(base.pre_error_len),
            dump_length: self.debl.or(base.dump_length),
            continue_on_failure: base.continue_on_failure || self.cont_on_tok_failure,
            callgraph: base.callgraph || self.callgraph.is_some(),
        }
    }
}

/// Dumps every input, returning how many script files failed. A failing
/// file is reported and the batch moves on.
fn dump(args: &DumpArgs, config: &EngineConfig, out: &mut dyn Write) -> Result<usize> {
    let game = args.game.unwrap_or(config.runtime.game);
    let parse = ParseOptions {
        capture_raw: config.runtime.parse.capture_raw || args.raw,
        ..config.runtime.parse
    };
    let format = args.format_options(&config.format);
    let mut events = (args.events || !args.convs).then(|| TokenFormatter::new(format.clone()));
    let mut convs = args.convs.then(|| {
        TokenFormatter::new(FormatOptions {
            callgraph: false,
            ..format.clone()
        })
    });

    let mut failed = 0;
    let sources = collect_sources(&args.files, args.lnk)?;
    let name_width = sources.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, data) in sources {
        let result = (|| -> Result<()> {
            let script = ScriptFile::parse(data, name.as_str(), game, parse)?;
            writeln!(
                out,
                "---------------- Parsed {name:name_width$}: {:4} {:4} {:4}",
                script.event_count(),
                script.conv_count(),
                script.filename_count()
            )?;
            let mut outcome = Ok(());
            if let Some(formatter) = events.as_mut() {
                outcome = formatter.process_event_chunks(&script);
                out.write_all(formatter.take_output().as_bytes())?;
            }
            if let Some(formatter) = convs.as_mut().filter(|_| outcome.is_ok()) {
                outcome = formatter.process_conv_chunks(&script);
                out.write_all(formatter.take_output().as_bytes())?;
            }
            outcome?;
            if args.rewrite {
                let path = args.rewrite_dir.join(format!("{name}.rewrite"));
                writeln!(out, "----->>> {}", path.display())?;
                fs::write(&path, script.write()?)
                    .with_context(|| format!("write {}", path.display()))?;
            }
            Ok(())
        })();
        if let Err(err) = result {
            failed += 1;
            eprintln!("{name}:");
            report_error(err);
        }
    }

    if let Some(formatter) = &events {
        out.write_all(formatter.summary("Script data").as_bytes())?;
        if let (Some(path), Some(graph)) = (&args.callgraph, formatter.callgraph()) {
            fs::write(path, graph.to_dot()).with_context(|| format!("write {}", path.display()))?;
            tracing::info!(path = %path.display(), nodes = graph.nodes().count(), "wrote callgraph");
        }
    }
    if let Some(formatter) = &convs {
        out.write_all(formatter.summary("conv-like data").as_bytes())?;
    }
    Ok(failed)
}

/// Script images named the way file-jump targets name them. Directories are
/// searched for `.scr` files, or `.dat` archives with `lnk`.
fn collect_sources(inputs: &[PathBuf], lnk: bool) -> Result<Vec<(String, Domain)>> {
    let wanted = if lnk { "dat" } else { "scr" };
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(
                WalkDir::new(input)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|entry| entry.file_type().is_file())
                    .map(|entry| entry.into_path())
                    .filter(|path| has_extension(path, wanted)),
            );
        } else {
            files.push(input.clone());
        }
    }

    let mut sources = Vec::new();
    for path in files {
        let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        if !lnk {
            sources.push((lower_file_name(&path), Domain::new(bytes)));
            continue;
        }
        let archive = LnkArchive::parse(Domain::new(bytes))
            .with_context(|| format!("parse archive {}", path.display()))?;
        for entry in archive.entries() {
            if !has_extension(Path::new(&entry.name), "scr") {
                tracing::debug!(entry = %entry.name, "skipping non-script archive entry");
                continue;
            }
            let data = archive
                .plain(entry)
                .with_context(|| format!("unpack {} from {}", entry.name, path.display()))?;
            sources.push((entry.name.to_lowercase(), data));
        }
    }
    Ok(sources)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
}

fn lower_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn play(args: &PlayArgs, config: &EngineConfig) -> Result<()> {
    let options = RuntimeOptions {
        game: args.game.unwrap_or(config.runtime.game),
        start_script: args.start.clone().or_else(|| config.runtime.start_script.clone()),
        continue_on_error: config.runtime.continue_on_error && !args.strict,
        seed: args.seed.or(config.runtime.seed),
        parse: config.runtime.parse,
    };
    let budget = config.media.cache_budget;
    let yaml = if args.lnk {
        let media = LnkMediaStorage::new(&args.dir, options.game).with_cache_budget(budget);
        play_with(media, options, args)?
    } else {
        let media = DirectoryStorage::new(&args.dir, options.game).with_cache_budget(budget);
        play_with(media, options, args)?
    };
    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, yaml).with_context(|| format!("write {}", path.display()))?;
        }
        None => io::stdout().lock().write_all(yaml.as_bytes())?,
    }
    Ok(())
}

fn play_with<M: MediaStorage>(media: M, options: RuntimeOptions, args: &PlayArgs) -> Result<String> {
    let game = options.game;
    let start_script = options.start_script().to_string();
    let frontend = RecordingFrontend::new(ChoicePolicy::First);
    let mut interpreter = Interpreter::new(media, frontend, options)?;
    let trace = PlaybackTrace::record(&mut interpreter, args.steps)?;
    tracing::info!(steps = trace.steps.len(), "playback finished");

    if let Some(path) = &args.save {
        let save = SaveData::new(
            interpreter.script().script_id(),
            interpreter.get_path_state(),
            interpreter.backlog().len(),
        );
        fs::write(path, save.to_binary()?).with_context(|| format!("write {}", path.display()))?;
    }

    let envelope = TraceEnvelope {
        trace_format_version: TRACE_FORMAT_VERSION,
        game,
        start_script,
        trace,
    };
    Ok(serde_yaml::to_string(&envelope)?)
}

fn lnk(path: &Path, extract: Option<&Path>) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let archive = LnkArchive::parse(Domain::new(bytes))?;
    let Some(dir) = extract else {
        let mut out = io::stdout().lock();
        for entry in archive.entries() {
            writeln!(
                out,
                "{:24} {:#10x} {:10} {}",
                entry.name,
                entry.offset,
                entry.len,
                if entry.compressed { "lnd" } else { "-" }
            )?;
        }
        return Ok(());
    };
    extract_archive(&archive, dir)
}

fn extract_archive(archive: &LnkArchive, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for entry in archive.entries() {
        let rel = sanitize_rel_path(Path::new(&entry.name))?;
        let path = dir.join(rel);
        let data = archive.plain(entry)?;
        fs::write(&path, data.get_data()).with_context(|| format!("write {}", path.display()))?;
    }
    tracing::info!(entries = archive.entries().len(), dir = %dir.display(), "extracted archive");
    Ok(())
}

fn verify_save(save_path: &Path, script_path: &Path, config: &EngineConfig) -> Result<()> {
    let save_bytes =
        fs::read(save_path).with_context(|| format!("read {}", save_path.display()))?;
    let save = SaveData::from_binary(&save_bytes)?;
    let script_bytes =
        fs::read(script_path).with_context(|| format!("read {}", script_path.display()))?;
    let script = ScriptFile::parse(
        Domain::new(script_bytes),
        lower_file_name(script_path),
        config.runtime.game,
        config.runtime.parse,
    )?;
    save.validate_script_id(&script.script_id())
        .with_context(|| format!("save is for script {}", script_id_hex(&save.script_id)))?;
    println!("save matches {}", script.name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc3_engine::PathState;

    /// SC3 image with one event chunk holding `body`.
    fn single_chunk_script(body: &[u8]) -> Vec<u8> {
        let end = 16 + body.len() as u32;
        let mut out = b"SC3\0".to_vec();
        out.extend(end.to_le_bytes());
        out.extend(end.to_le_bytes());
        out.extend(16u32.to_le_bytes());
        out.extend(body);
        out
    }

    fn dump_args(files: Vec<PathBuf>) -> DumpArgs {
        DumpArgs {
            files,
            rewrite_dir: PathBuf::from("."),
            ..DumpArgs::default()
        }
    }

    #[test]
    fn dump_reports_bad_files_and_keeps_going() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("A.SCR"), single_chunk_script(&[0x00, 0x06])).expect("write");
        fs::write(dir.path().join("b.scr"), single_chunk_script(&[0x77, 0x00])).expect("write");
        fs::write(dir.path().join("notes.txt"), b"skip").expect("write");

        let mut out = Vec::new();
        let failed = dump(
            &dump_args(vec![dir.path().to_path_buf()]),
            &EngineConfig::default(),
            &mut out,
        )
        .expect("batch completes");
        let text = String::from_utf8(out).expect("utf-8");

        assert_eq!(failed, 1);
        assert!(text.contains("---------------- Parsed a.scr:    1    0    0"));
        assert!(text.contains("---------------- Parsed b.scr:    1    0    0"));
        assert!(text.contains("-------- Failed to tokenize(b.scr:es0)"));
        assert!(text.contains("---------------- Summary (Script data):"));
        assert!(!text.contains("notes.txt"));
    }

    #[test]
    fn dump_rewrites_and_writes_the_callgraph() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = single_chunk_script(&[0x00, 0x06]);
        let input = dir.path().join("op00.scr");
        fs::write(&input, &image).expect("write");
        let dot = dir.path().join("graph.dot");

        let args = DumpArgs {
            rewrite: true,
            rewrite_dir: dir.path().to_path_buf(),
            callgraph: Some(dot.clone()),
            ..dump_args(vec![input])
        };
        let mut out = Vec::new();
        assert_eq!(dump(&args, &EngineConfig::default(), &mut out).expect("dumps"), 0);

        let rewritten = fs::read(dir.path().join("op00.scr.rewrite")).expect("rewritten");
        assert_eq!(rewritten, image);
        assert!(fs::read_to_string(dot).expect("dot").contains("\"op00.scr:0\""));
    }

    #[test]
    fn dump_reads_scripts_from_lnk_archives() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = single_chunk_script(&[0x00, 0x06]);
        let archive = LnkArchive::build([
            ("OP00.SCR", image.as_slice(), false),
            ("README.TXT", &b"text"[..], false),
        ])
        .expect("builds");
        let path = dir.path().join("script.dat");
        fs::write(&path, archive.write().expect("writes")).expect("write");

        let sources = collect_sources(&[path], true).expect("collects");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].0, "op00.scr");
        assert_eq!(sources[0].1.get_data(), image.as_slice());
    }

    #[test]
    fn flags_extend_configured_format_options() {
        let args = DumpArgs {
            ttf: true,
            esflen: Some(2),
            callgraph: Some(PathBuf::from("g.dot")),
            ..dump_args(Vec::new())
        };
        let base = FormatOptions {
            offsets: true,
            pre_error_len: Some(3),
            ..FormatOptions::default()
        };
        let options = args.format_options(&base);
        assert!(options.token_frequency && options.offsets && options.callgraph);
        assert_eq!(options.element_start_len, Some(2));
        assert_eq!(options.pre_error_len, Some(3));
        assert!(!options.continue_on_failure);
    }

    #[test]
    fn extract_writes_plain_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive =
            LnkArchive::build([("BG01.CPS", &b"pixels"[..], false)]).expect("builds");
        let out = dir.path().join("bg");
        extract_archive(&archive, &out).expect("extracts");
        assert_eq!(fs::read(out.join("BG01.CPS")).expect("extracted"), b"pixels");
    }

    #[test]
    fn verify_save_checks_the_script_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = single_chunk_script(&[0x00, 0x06]);
        let script_path = dir.path().join("op00.scr");
        fs::write(&script_path, &image).expect("write");
        let script = ScriptFile::parse(
            Domain::new(image),
            "op00.scr",
            Game::Ever17,
            ParseOptions::default(),
        )
        .expect("parses");

        let save_path = dir.path().join("slot0.sav");
        let save = SaveData::new(script.script_id(), PathState::new("op00.scr", 1), 0);
        fs::write(&save_path, save.to_binary().expect("encodes")).expect("write");
        verify_save(&save_path, &script_path, &EngineConfig::default()).expect("matches");

        let other = SaveData::new([7; 32], PathState::new("op00.scr", 1), 0);
        fs::write(&save_path, other.to_binary().expect("encodes")).expect("write");
        assert!(verify_save(&save_path, &script_path, &EngineConfig::default()).is_err());
    }
}
