use phenotag_domain::{pterr, to_pt, PtResult};

/// Normalized event vocabulary of the tool. The input layer turns raw mouse
/// and key events into these, the controller consumes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    PointCommit { x: u32, y: u32 },
    BoxBegin { x: u32, y: u32 },
    BoxDrag { x: u32, y: u32 },
    BoxEnd { x: u32, y: u32 },
    CursorMove { x: u32, y: u32 },
    LabelSelect(usize),
    Undo,
    Commit,
    NextImage,
    PrevImage,
    Quit,
}

fn parse_coord(token: Option<&str>, cmd: &str) -> PtResult<u32> {
    token
        .ok_or_else(|| pterr!("gesture '{}' is missing a coordinate", cmd))?
        .parse::<u32>()
        .map_err(to_pt)
}

/// Parses one line of the scripted gesture format, e.g. `point 10 20` or
/// `label 2`. Skipping empty and comment lines is the caller's business.
pub fn parse_gesture(line: &str) -> PtResult<Gesture> {
    let mut tokens = line.split_whitespace();
    let cmd = tokens
        .next()
        .ok_or_else(|| pterr!("cannot parse an empty gesture line"))?;
    let gesture = match cmd {
        "point" => Gesture::PointCommit {
            x: parse_coord(tokens.next(), cmd)?,
            y: parse_coord(tokens.next(), cmd)?,
        },
        "box-begin" => Gesture::BoxBegin {
            x: parse_coord(tokens.next(), cmd)?,
            y: parse_coord(tokens.next(), cmd)?,
        },
        "box-drag" => Gesture::BoxDrag {
            x: parse_coord(tokens.next(), cmd)?,
            y: parse_coord(tokens.next(), cmd)?,
        },
        "box-end" => Gesture::BoxEnd {
            x: parse_coord(tokens.next(), cmd)?,
            y: parse_coord(tokens.next(), cmd)?,
        },
        "move" => Gesture::CursorMove {
            x: parse_coord(tokens.next(), cmd)?,
            y: parse_coord(tokens.next(), cmd)?,
        },
        "label" => {
            let n = tokens
                .next()
                .ok_or_else(|| pterr!("gesture 'label' is missing a number"))?
                .parse::<usize>()
                .map_err(to_pt)?;
            Gesture::LabelSelect(n)
        }
        "undo" => Gesture::Undo,
        "commit" => Gesture::Commit,
        "next" => Gesture::NextImage,
        "prev" => Gesture::PrevImage,
        "quit" => Gesture::Quit,
        _ => return Err(pterr!("unknown gesture '{}'", cmd)),
    };
    Ok(gesture)
}

#[test]
fn test_parse() {
    assert_eq!(
        parse_gesture("point 10 20").unwrap(),
        Gesture::PointCommit { x: 10, y: 20 }
    );
    assert_eq!(
        parse_gesture("box-begin 5 5").unwrap(),
        Gesture::BoxBegin { x: 5, y: 5 }
    );
    assert_eq!(
        parse_gesture("box-drag 3 4").unwrap(),
        Gesture::BoxDrag { x: 3, y: 4 }
    );
    assert_eq!(
        parse_gesture("box-end 1 1").unwrap(),
        Gesture::BoxEnd { x: 1, y: 1 }
    );
    assert_eq!(
        parse_gesture("  move 7 8  ").unwrap(),
        Gesture::CursorMove { x: 7, y: 8 }
    );
    assert_eq!(parse_gesture("label 3").unwrap(), Gesture::LabelSelect(3));
    assert_eq!(parse_gesture("undo").unwrap(), Gesture::Undo);
    assert_eq!(parse_gesture("commit").unwrap(), Gesture::Commit);
    assert_eq!(parse_gesture("next").unwrap(), Gesture::NextImage);
    assert_eq!(parse_gesture("prev").unwrap(), Gesture::PrevImage);
    assert_eq!(parse_gesture("quit").unwrap(), Gesture::Quit);
}

#[test]
fn test_parse_errors() {
    assert!(parse_gesture("").is_err());
    assert!(parse_gesture("point 10").is_err());
    assert!(parse_gesture("point ten twenty").is_err());
    assert!(parse_gesture("label -1").is_err());
    assert!(parse_gesture("wiggle 1 2").is_err());
}
