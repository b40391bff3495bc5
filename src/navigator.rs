//! Navigation algorithm: drives a robot from an unknown pose to `(0,0)`
//! using only the position deltas reported after each command (spec.md §4.4).

use std::io::{Read, Write};

use crate::error::SessionError;
use crate::framer::Deadline;
use crate::protocol::{Phase, ServerCommand};
use crate::session::Session;

/// Grid position as `(x, y)`.
pub type Position = (i64, i64);

/// The heading the robot is currently facing. `None` means it has not been
/// observed yet (no successful `MOVE` has changed position since the
/// connection opened).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// +y
    Up,
    /// -y
    Down,
    /// -x
    Left,
    /// +x
    Right,
    /// Not yet observed.
    None,
}

impl Direction {
    /// One step of the `TURN RIGHT` table.
    pub const fn turn_right(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
            Self::None => Self::None,
        }
    }

    /// One step of the `TURN LEFT` table.
    pub const fn turn_left(self) -> Self {
        match self {
            Self::Up => Self::Left,
            Self::Left => Self::Down,
            Self::Down => Self::Right,
            Self::Right => Self::Up,
            Self::None => Self::None,
        }
    }
}

/// Which server reply we're about to process, selecting how the heading is
/// updated (spec.md §4.4 "classification parameter `turn`").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reply {
    /// Reply to `MOVE`: derive heading from the position delta.
    Move,
    /// Reply to `TURN LEFT`: advance heading via the left table.
    TurnLeft,
    /// Reply to `TURN RIGHT`: advance heading via the right table.
    TurnRight,
}

/// Which axis the caller is currently aligning to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// Navigate `session`'s robot to `(0,0)` and return the secret message
/// (terminator stripped) retrieved via `GET MESSAGE`.
pub fn navigate<S>(session: &mut Session<S>) -> Result<Vec<u8>, SessionError>
where
    S: Read + Write + Deadline,
{
    discover_start(session)?;

    while session.position != (0, 0) {
        align(session, Axis::Y)?;
        while session.position.1 != 0 {
            send_and_read(session, ServerCommand::Move, Reply::Move)?;
        }

        align(session, Axis::X)?;
        while session.position.0 != 0 {
            send_and_read(session, ServerCommand::Move, Reply::Move)?;
        }
    }

    session.framer.send(&ServerCommand::GetMessage.encode())?;
    let message = session.framer.next_message(Phase::Message)?;
    Ok(crate::protocol::strip_suffix(&message).to_vec())
}

/// Heading discovery (spec.md §4.4): one `TURN RIGHT` to learn the starting
/// coordinates, then `MOVE` until the position actually changes.
fn discover_start<S>(session: &mut Session<S>) -> Result<(), SessionError>
where
    S: Read + Write + Deadline,
{
    send_and_read(session, ServerCommand::TurnRight, Reply::TurnRight)?;
    if session.position == (0, 0) {
        return Ok(());
    }

    send_and_read(session, ServerCommand::Move, Reply::Move)?;
    while session.direction == Direction::None {
        send_and_read(session, ServerCommand::TurnRight, Reply::TurnRight)?;
        send_and_read(session, ServerCommand::Move, Reply::Move)?;
    }
    Ok(())
}

/// Turn right (up to three times) until the robot faces the direction that
/// closes the given axis (spec.md §4.4 main loop, step 1/2).
fn align<S>(session: &mut Session<S>, axis: Axis) -> Result<(), SessionError>
where
    S: Read + Write + Deadline,
{
    let target = match axis {
        Axis::Y => match session.position.1.signum() {
            -1 => Some(Direction::Up),
            1 => Some(Direction::Down),
            _ => None,
        },
        Axis::X => match session.position.0.signum() {
            -1 => Some(Direction::Right),
            1 => Some(Direction::Left),
            _ => None,
        },
    };

    let Some(target) = target else {
        return Ok(());
    };
    while session.direction != target {
        send_and_read(session, ServerCommand::TurnRight, Reply::TurnRight)?;
    }
    Ok(())
}

/// The fixed obstacle-dodge sequence (spec.md §4.4): step one cell sideways,
/// two cells forward, one cell back, restoring heading, with an early exit
/// if the detour itself lands the robot on the target axis.
fn dodge<S>(session: &mut Session<S>) -> Result<(), SessionError>
where
    S: Read + Write + Deadline,
{
    send_and_read(session, ServerCommand::TurnRight, Reply::TurnRight)?;
    send_and_read(session, ServerCommand::Move, Reply::Move)?;
    send_and_read(session, ServerCommand::TurnLeft, Reply::TurnLeft)?;
    send_and_read(session, ServerCommand::Move, Reply::Move)?;

    if session.position.0 == 0 || session.position.1 == 0 {
        return Ok(());
    }

    send_and_read(session, ServerCommand::Move, Reply::Move)?;
    send_and_read(session, ServerCommand::TurnLeft, Reply::TurnLeft)?;
    send_and_read(session, ServerCommand::Move, Reply::Move)?;
    send_and_read(session, ServerCommand::TurnRight, Reply::TurnRight)?;
    Ok(())
}

fn send_and_read<S>(
    session: &mut Session<S>,
    command: ServerCommand,
    reply: Reply,
) -> Result<(), SessionError>
where
    S: Read + Write + Deadline,
{
    session.framer.send(&command.encode())?;
    read_reply(session, reply)
}

/// Read and apply one position reply, dodging an obstacle if a `MOVE`
/// reported zero displacement with a known heading (spec.md §4.4).
fn read_reply<S>(session: &mut Session<S>, reply: Reply) -> Result<(), SessionError>
where
    S: Read + Write + Deadline,
{
    session.old_position = session.position;
    let message = session.framer.next_message(Phase::Ok)?;
    session.position = crate::protocol::parse_ok_reply(crate::protocol::strip_suffix(&message))?;

    let blocked = reply == Reply::Move
        && session.position == session.old_position
        && session.direction != Direction::None;
    if blocked {
        dodge(session)?;
    }

    match reply {
        Reply::Move => {
            // After a dodge, `position`/`old_position` reflect the dodge's
            // own last step rather than the blocked move that triggered it;
            // their delta is then zero, so this intentionally leaves the
            // heading the dodge already restored untouched.
            if session.position != session.old_position {
                session.direction = derive_direction(session.old_position, session.position);
            }
        }
        Reply::TurnLeft => session.direction = session.direction.turn_left(),
        Reply::TurnRight => session.direction = session.direction.turn_right(),
    }
    Ok(())
}

fn derive_direction(old: Position, new: Position) -> Direction {
    let (dx, dy) = (new.0 - old.0, new.1 - old.1);
    if dx > 0 {
        Direction::Right
    } else if dx < 0 {
        Direction::Left
    } else if dy > 0 {
        Direction::Up
    } else {
        Direction::Down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn turn_left_and_turn_right_are_inverse_cycles() {
        let headings = [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ];
        for heading in headings {
            // Four rights return to start; one left undoes one right.
            let mut d = heading;
            for _ in 0..4 {
                d = d.turn_right();
            }
            assert_eq!(d, heading);
            assert_eq!(heading.turn_right().turn_left(), heading);
        }
    }

    #[test]
    fn none_is_a_fixed_point_for_both_tables() {
        assert_eq!(Direction::None.turn_left(), Direction::None);
        assert_eq!(Direction::None.turn_right(), Direction::None);
    }

    #[test]
    fn derive_direction_matches_delta_sign() {
        assert_eq!(derive_direction((0, 0), (1, 0)), Direction::Right);
        assert_eq!(derive_direction((0, 0), (-1, 0)), Direction::Left);
        assert_eq!(derive_direction((0, 0), (0, 1)), Direction::Up);
        assert_eq!(derive_direction((0, 0), (0, -1)), Direction::Down);
    }

    #[test]
    fn left_k_times_equals_right_negative_k_mod_four() {
        for k in 0_i32..8 {
            let mut via_left = Direction::Up;
            for _ in 0..k {
                via_left = via_left.turn_left();
            }
            let equiv = (((-k).rem_euclid(4)) % 4) as u32;
            let mut via_right = Direction::Up;
            for _ in 0..equiv {
                via_right = via_right.turn_right();
            }
            assert_eq!(via_left, via_right, "k = {k}");
        }
    }

    proptest! {
        /// ∀ heading, k: applying `TURN_LEFT` k times equals applying
        /// `TURN_RIGHT` (-k mod 4) times (spec.md §8).
        #[test]
        fn left_right_inverse_holds_for_any_start_and_k(
            start in 0_u8..4,
            k in 0_i32..40,
        ) {
            let headings = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];
            let mut via_left = headings[start as usize];
            for _ in 0..k {
                via_left = via_left.turn_left();
            }

            let equiv = (-k).rem_euclid(4) as u32;
            let mut via_right = headings[start as usize];
            for _ in 0..equiv {
                via_right = via_right.turn_right();
            }

            prop_assert_eq!(via_left, via_right);
        }
    }

    /// An in-process grid simulator standing in for a real robot: it tracks
    /// its own true heading and position, applies `MOVE`/`TURN` commands the
    /// navigator writes, refuses to step onto an obstacle cell, and replies
    /// with the framed `OK <x> <y>` the navigator expects. Used to exercise
    /// [`navigate`] end-to-end without a socket (spec.md §8 "obstacle-free
    /// open grids" termination bound).
    struct GridSim {
        x: i64,
        y: i64,
        heading: Direction,
        obstacles: std::collections::HashSet<(i64, i64)>,
        pending_write: Vec<u8>,
        pending_read: std::collections::VecDeque<u8>,
        move_count: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl GridSim {
        fn new(x: i64, y: i64, heading: Direction) -> Self {
            Self {
                x,
                y,
                heading,
                obstacles: std::collections::HashSet::new(),
                pending_write: Vec::new(),
                pending_read: std::collections::VecDeque::new(),
                move_count: std::rc::Rc::new(std::cell::Cell::new(0)),
            }
        }

        fn step(&mut self) -> (i64, i64) {
            let (dx, dy) = match self.heading {
                Direction::Up => (0, 1),
                Direction::Down => (0, -1),
                Direction::Left => (-1, 0),
                Direction::Right => (1, 0),
                Direction::None => (0, 0),
            };
            let target = (self.x + dx, self.y + dy);
            if !self.obstacles.contains(&target) {
                self.x = target.0;
                self.y = target.1;
            }
            (self.x, self.y)
        }

        fn handle_command(&mut self, command: &[u8]) {
            let text = std::str::from_utf8(crate::protocol::strip_suffix(command)).unwrap();
            match text {
                "102 MOVE" => {
                    self.move_count.set(self.move_count.get() + 1);
                    self.step();
                    self.reply_ok();
                }
                "103 TURN LEFT" => {
                    self.heading = self.heading.turn_left();
                    self.reply_ok();
                }
                "104 TURN RIGHT" => {
                    self.heading = self.heading.turn_right();
                    self.reply_ok();
                }
                "105 GET MESSAGE" => {
                    self.pending_read.extend(b"Secret");
                    self.pending_read.extend(&crate::protocol::SUFFIX);
                }
                other => panic!("grid sim received unexpected command {other:?}"),
            }
        }

        fn reply_ok(&mut self) {
            let reply = format!("OK {} {}", self.x, self.y);
            self.pending_read.extend(reply.as_bytes());
            self.pending_read.extend(&crate::protocol::SUFFIX);
        }
    }

    impl Read for GridSim {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pending_read.is_empty() {
                return Ok(0);
            }
            let mut n = 0;
            while n < buf.len() {
                let Some(byte) = self.pending_read.pop_front() else {
                    break;
                };
                buf[n] = byte;
                n += 1;
            }
            Ok(n)
        }
    }

    impl Write for GridSim {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.pending_write.extend_from_slice(buf);
            if self.pending_write.ends_with(&crate::protocol::SUFFIX) {
                let command = std::mem::take(&mut self.pending_write);
                self.handle_command(&command);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl crate::framer::Deadline for GridSim {
        fn set_timeout(&mut self, _timeout: Option<std::time::Duration>) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn navigator_reaches_origin_on_obstacle_free_grids_within_bound() {
        let starts = [
            (5, 3, Direction::Up),
            (-4, 6, Direction::Right),
            (7, -2, Direction::Left),
            (-3, -3, Direction::Down),
            (0, 9, Direction::Up),
            (9, 0, Direction::Down),
        ];

        for (x0, y0, heading) in starts {
            let sim = GridSim::new(x0, y0, heading);
            let move_count = std::rc::Rc::clone(&sim.move_count);
            let mut session = Session::new(sim);
            let message = navigate(&mut session).expect("obstacle-free grid never fails");

            assert_eq!(session.position, (0, 0));
            assert_eq!(message, b"Secret");
            let bound = x0.abs() + y0.abs() + 6;
            assert!(
                move_count.get() <= bound as usize,
                "start=({x0},{y0}) heading={heading:?} took too many moves"
            );
        }
    }
}
