use std::time::Duration;

use common::Track;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::app::App;
use crate::backend::PlaybackBackend;
use crate::state::{format_clock, NowPlaying, SessionObserver, Status};

const HELP: &str = "\
commands:
  list                      show the library
  select N                  select track N
  play [N]                  play the selection (or track N)
  resume | pause | stop
  seek SECS                 jump to a position
  volume PCT                0..100
  add PATH                  add an audio file
  remove                    remove the selection
  edit                      edit the selection
  set title|artist|album VALUE
  image add|remove PATH
  save | cancel             finish editing
  folders                   list music folders
  folder add|remove PATH
  scan                      scan the music folders
  reload                    re-read the library file
  status
  quit";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Title,
    Artist,
    Album,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Help,
    List,
    Select(usize),
    Play(Option<usize>),
    Resume,
    Pause,
    Stop,
    Seek(Duration),
    Volume(f32),
    Add(String),
    Remove,
    Edit,
    Set(Field, String),
    AddImage(String),
    RemoveImage(String),
    Save,
    Cancel,
    Folders,
    AddFolder(String),
    RemoveFolder(String),
    Scan,
    Reload,
    Status,
    Quit,
}

/// Parses one input line. Track numbers are 1-based on the command line.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "list" | "ls" => Command::List,
        "select" => Command::Select(parse_index(rest)?),
        "play" if rest.is_empty() => Command::Play(None),
        "play" => Command::Play(Some(parse_index(rest)?)),
        "resume" => Command::Resume,
        "pause" => Command::Pause,
        "stop" => Command::Stop,
        "seek" => {
            let position = rest
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .ok_or_else(|| format!("bad position: {:?}", rest))?;
            Command::Seek(position)
        }
        "volume" | "vol" => {
            let pct: f32 = rest.parse().map_err(|_| format!("bad volume: {:?}", rest))?;
            Command::Volume(pct / 100.0)
        }
        "add" => Command::Add(require(rest, "path")?),
        "remove" | "rm" => Command::Remove,
        "edit" => Command::Edit,
        "set" => {
            let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let field = match field.to_ascii_lowercase().as_str() {
                "title" => Field::Title,
                "artist" => Field::Artist,
                "album" => Field::Album,
                other => return Err(format!("unknown field: {:?}", other)),
            };
            Command::Set(field, value.trim().to_string())
        }
        "image" => match rest.split_once(char::is_whitespace) {
            Some(("add", path)) => Command::AddImage(require(path, "path")?),
            Some(("remove", path)) => Command::RemoveImage(require(path, "path")?),
            _ => return Err("usage: image add|remove PATH".to_string()),
        },
        "save" => Command::Save,
        "cancel" => Command::Cancel,
        "folders" => Command::Folders,
        "folder" => match rest.split_once(char::is_whitespace) {
            Some(("add", path)) => Command::AddFolder(require(path, "path")?),
            Some(("remove", path)) => Command::RemoveFolder(require(path, "path")?),
            _ => return Err("usage: folder add|remove PATH".to_string()),
        },
        "scan" => Command::Scan,
        "reload" => Command::Reload,
        "status" => Command::Status,
        "quit" | "exit" | "q" => Command::Quit,
        "" => return Err(String::new()),
        other => return Err(format!("unknown command: {:?} (try help)", other)),
    };
    Ok(command)
}

fn parse_index(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("bad track number: {:?}", value)),
    }
}

fn require(value: &str, what: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        Err(format!("missing {}", what))
    } else {
        Ok(value.to_string())
    }
}

/// Prints session updates to stdout.
pub struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn status_changed(&mut self, status: &Status) {
        println!("[{}]", status);
    }

    fn now_playing_changed(&mut self, now_playing: &NowPlaying) {
        print_now_playing(now_playing);
    }
}

fn print_now_playing(view: &NowPlaying) {
    println!("> {}", view.title);
    println!("  {} / {}", view.artist, view.album);
    println!("  image: {}", view.image);
}

fn print_track_line(index: usize, track: &Track, selected: bool) {
    let marker = if selected { '*' } else { ' ' };
    let artist = if track.resolved { track.artist.as_str() } else { "?" };
    println!("{}{:>3}. {} ({})", marker, index + 1, track.title, artist);
}

/// Reads commands from stdin and applies lookup completions as they arrive,
/// both on the task that owns `app`. Returns on `quit`, Ctrl-C or end of
/// input.
pub async fn run<B: PlaybackBackend>(app: &mut App<B>) -> io::Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();
    println!("{} tracks loaded. Type help for commands.", app.library().len());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(app, command),
                    Err(message) if message.is_empty() => {}
                    Err(message) => println!("{}", message),
                }
            }
            Some(completion) = app.next_completion() => {
                let outcome = app.handle_completion(completion);
                debug!(?outcome, "Lookup completion handled");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn execute<B: PlaybackBackend>(app: &mut App<B>, command: Command) {
    match command {
        Command::Help => println!("{}", HELP),
        Command::List => {
            let selected = app.selected().map(|track| track.file_path.clone());
            if app.library().is_empty() {
                println!("(library is empty)");
            }
            for (index, track) in app.library().tracks().iter().enumerate() {
                print_track_line(index, track, selected.as_deref() == Some(track.file_path.as_str()));
            }
        }
        Command::Select(index) => {
            if app.select(index).is_none() {
                println!("no track {}", index + 1);
            }
        }
        Command::Play(index) => {
            if let Some(index) = index {
                if app.select(index).is_none() {
                    println!("no track {}", index + 1);
                    return;
                }
            }
            if !app.play_selected() {
                println!("nothing selected");
            }
        }
        Command::Resume => {
            if !app.resume_selected() {
                println!("nothing selected");
            }
        }
        Command::Pause => app.pause(),
        Command::Stop => app.stop(),
        Command::Seek(position) => app.seek(position),
        Command::Volume(level) => app.set_volume(level),
        Command::Add(path) => {
            let added = app.add_files(&[path.as_str()]);
            println!("added {} track(s)", added);
        }
        Command::Remove => match app.remove_selected() {
            Some(track) => println!("removed {}", track.title),
            None => println!("nothing selected"),
        },
        Command::Edit => match app.open_editor() {
            Ok(editor) => {
                let draft = editor.draft();
                println!("editing {}", editor.file_path());
                println!("  title:  {}", draft.title);
                println!("  artist: {}", draft.artist);
                println!("  album:  {}", draft.album);
                println!("  images: {:?}", draft.images);
            }
            Err(err) => println!("{}", err),
        },
        Command::Set(field, value) => match app.editor_mut() {
            Ok(editor) => {
                let draft = editor.draft_mut();
                match field {
                    Field::Title => draft.title = value,
                    Field::Artist => draft.artist = value,
                    Field::Album => draft.album = value,
                }
            }
            Err(err) => println!("{}", err),
        },
        Command::AddImage(path) => match app.editor_mut() {
            Ok(editor) => editor.add_image(&path),
            Err(err) => println!("{}", err),
        },
        Command::RemoveImage(path) => match app.editor_mut() {
            Ok(editor) => {
                if !editor.remove_image(&path) {
                    println!("no such image");
                }
            }
            Err(err) => println!("{}", err),
        },
        Command::Save => match app.save_editor() {
            Ok(commit) => println!("saved {}", commit.file_path),
            Err(err) => {
                warn!("Edit not saved: {}", err);
                println!("{}", err);
            }
        },
        Command::Cancel => {
            if !app.cancel_editor() {
                println!("no editor is open");
            }
        }
        Command::Folders => {
            for folder in &app.settings().music_folders {
                println!("  {}", folder);
            }
        }
        Command::AddFolder(path) => {
            if !app.add_folder(&path) {
                println!("already registered");
            }
        }
        Command::RemoveFolder(path) => {
            if !app.remove_folder(&path) {
                println!("not registered");
            }
        }
        Command::Scan => {
            let report = app.scan();
            println!("found {} files, added {}", report.found, report.added);
        }
        Command::Reload => {
            app.reload();
            println!("{} tracks loaded", app.library().len());
        }
        Command::Status => print_status(app),
        Command::Quit => {}
    }
}

fn print_status<B: PlaybackBackend>(app: &App<B>) {
    let session = app.session();
    println!("[{}]", session.status());
    if let Some(view) = session.now_playing() {
        print_now_playing(view);
    }
    if let Some(progress) = session.progress() {
        let total = progress
            .duration
            .map(format_clock)
            .unwrap_or_else(|| "--:--".to_string());
        println!("  {} / {}", format_clock(progress.position), total);
    }
    println!("  volume {:.0}%", session.volume() * 100.0);
    if let Some(path) = session.pending_lookup() {
        println!("  looking up {}", path);
    }
}
