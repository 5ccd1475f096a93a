#![deny(clippy::all)]
#![forbid(unsafe_code)]

use clap::Parser;
use phenotag_domain::{pterr, PtResult};
use ptlib::{
    cache::{ImageCache, ImageFileLoader, LruImageCache},
    cfg::get_cfg,
    controller::{EditController, StateChange},
    events::{parse_gesture, Gesture},
    file_util,
    image_list::list_image_files,
    result::trace_ok_err,
    session::Session,
    tracing_setup,
    voc_import::convert_voc_dir,
};
use std::{
    io::{self, BufRead},
    panic,
    path::PathBuf,
};
use tracing::{error, info, warn};

const MAX_N_LABELS: usize = 9;

#[derive(Parser)]
struct Cli {
    /// Folder with the images to annotate
    input_folder: PathBuf,
    /// Where the annotation json files go, the input folder if omitted
    #[arg(short, long)]
    save_dir: Option<PathBuf>,
    /// Labels selectable via the digit keys 1-9, in that order
    #[arg(short, long, num_args = 1..)]
    labels: Vec<String>,
    /// How many decoded images to keep in memory
    #[arg(long)]
    cache_capacity: Option<usize>,
    /// Read gestures from this file instead of stdin
    #[arg(long)]
    script: Option<PathBuf>,
    /// Convert a folder of Pascal VOC xml files into annotation files
    /// and exit
    #[arg(long)]
    import_voc: Option<PathBuf>,
}

fn print_frame<C>(ctrl: &EditController, session: &Session<C>)
where
    C: ImageCache,
{
    let snapshot = ctrl.snapshot(session);
    let n_entries = snapshot.annotations.len();
    let target = snapshot
        .target_index
        .map_or("-".to_string(), |idx| format!("{}", idx + 1));
    println!(
        "[{}/{}] {} | label {} | entry {target}/{n_entries}",
        session.current_idx() + 1,
        session.image_count(),
        session.current_image_name(),
        ctrl.active_label(),
    );
}

fn run_gestures<C, I>(
    ctrl: &mut EditController,
    session: &mut Session<C>,
    lines: I,
) -> PtResult<()>
where
    C: ImageCache,
    I: Iterator<Item = String>,
{
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let gesture = match parse_gesture(trimmed) {
            Ok(g) => g,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };
        let change = ctrl.handle_gesture(gesture, session)?;
        if gesture == Gesture::Quit {
            return Ok(());
        }
        if change == StateChange::Changed {
            print_frame(ctrl, session);
        }
    }
    // gestures ran out without an explicit quit, the edits are kept anyway
    session.flush()
}

fn run(cli: Cli) -> PtResult<()> {
    if let Some(voc_dir) = &cli.import_voc {
        let save_dir = cli.save_dir.as_deref().unwrap_or(voc_dir);
        let n = convert_voc_dir(voc_dir, save_dir)?;
        info!("converted {n} voc files into {save_dir:?}");
        return Ok(());
    }
    let image_paths = list_image_files(&cli.input_folder)?;
    if image_paths.is_empty() {
        return Err(pterr!("no images found in {:?}", cli.input_folder));
    }
    let labels = if cli.labels.is_empty() {
        vec!["unknown".to_string()]
    } else {
        cli.labels.clone()
    };
    if labels.len() > MAX_N_LABELS {
        return Err(pterr!(
            "at most {} labels fit on the digit keys, got {}",
            MAX_N_LABELS,
            labels.len()
        ));
    }
    let cfg = get_cfg()?;
    let save_dir = cli
        .save_dir
        .clone()
        .or_else(|| cfg.save_dir().map(PathBuf::from))
        .unwrap_or_else(|| cli.input_folder.clone());
    let capacity = cli.cache_capacity.unwrap_or(cfg.image_cache_capacity);
    let cache = LruImageCache::<ImageFileLoader>::new(capacity)?;
    let mut session = Session::new(image_paths, save_dir, cache)?;
    let mut ctrl = EditController::new(labels)?;
    print_frame(&ctrl, &session);
    match &cli.script {
        Some(script_path) => {
            let script = file_util::read_to_string(script_path)?;
            run_gestures(&mut ctrl, &mut session, script.lines().map(str::to_string))
        }
        None => run_gestures(
            &mut ctrl,
            &mut session,
            io::stdin().lock().lines().map_while(Result::ok),
        ),
    }
}

fn main() {
    let _guard_flush_to_logfile = tracing_setup::tracing_setup();
    if let Err(e) = panic::catch_unwind(|| {
        let cli = Cli::parse();
        if trace_ok_err(run(cli)).is_none() {
            error!("phenotag did not terminate cleanly");
            std::process::exit(1);
        }
    }) {
        let panic_s = e
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| e.downcast_ref::<&'static str>().copied());
        error!("{panic_s:?}");
        if let Some(b) = tracing_setup::BACKTRACE.with(|b| b.borrow_mut().take()) {
            error!("{b:?}");
        }
    }
}
