use std::cmp;
use std::os::unix::io::RawFd;

use nix::libc;

/// Assumed when standard output is not a terminal.
pub const DEFAULT_WIDTH: u16 = 80;

/// Columns reserved for a console timestamp.
const RESERVED_COLUMNS: usize = 6;
const MIN_COLUMN_WIDTH: usize = 32;

nix::ioctl_read_bad!(tiocgwinsz, libc::TIOCGWINSZ, libc::winsize);

/// Window size of the terminal open on `fd`.
fn window_size(fd: RawFd) -> nix::Result<libc::winsize> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    // Sound: TIOCGWINSZ only writes one winsize through the pointer, and
    // `size` is a live, properly aligned winsize. A bad fd is an Err.
    unsafe { tiocgwinsz(fd, &mut size) }?;
    Ok(size)
}

/// Width of the terminal on standard output.
pub fn terminal_width() -> u16 {
    match window_size(libc::STDOUT_FILENO) {
        Ok(ref size) if size.ws_col != 0 => size.ws_col,
        _ => DEFAULT_WIDTH,
    }
}

/// Space available to a report line on a terminal `width` columns wide.
pub fn column_width(width: u16) -> usize {
    cmp::max(
        (width as usize).saturating_sub(RESERVED_COLUMNS),
        MIN_COLUMN_WIDTH,
    )
}
