use std::io::{self, Write};
#[cfg(unix)]
use std::mem::ManuallyDrop;
#[cfg(unix)]
use std::os::unix::io::FromRawFd;
use std::path::Path;
use std::process;

use clap::Parser;
#[cfg(unix)]
use memmap2::MmapOptions;

use z85_rs::common::io::read_file;
use z85_rs::common::{gnu_name, io_error_msg};
use z85_rs::z85::stream as z85;

#[derive(Parser)]
#[command(
    name = "z85",
    about = "Z85 encode or decode FILE, or standard input, to standard output.",
    after_help = "With no FILE, or when FILE is -, read standard input.\n\n\
        The data are encoded with the ZeroMQ Z85 alphabet (RFC 32/Z85).\n\
        Input whose length is not a multiple of 4 ends in a short group of\n\
        2 to 4 characters.  When decoding, the input may contain whitespace\n\
        in addition to the 85 alphabet characters.  Use --ignore-garbage to\n\
        attempt to recover from any other non-alphabet bytes in the stream.",
    version
)]
struct Cli {
    /// Decode data
    #[arg(short = 'd', long = "decode")]
    decode: bool,

    /// When decoding, ignore non-alphabet characters
    #[arg(short = 'i', long = "ignore-garbage")]
    ignore_garbage: bool,

    /// Wrap encoded lines after COLS character (default 76).
    /// Use 0 to disable line wrapping
    #[arg(short = 'w', long = "wrap", value_name = "COLS", default_value = "76")]
    wrap: usize,

    /// File to process (reads stdin if omitted or -)
    file: Option<String>,
}

/// Raw fd stdout for zero-overhead writes on Unix.
/// The stream layer already batches output into large chunks.
#[cfg(unix)]
#[inline]
fn raw_stdout() -> ManuallyDrop<std::fs::File> {
    unsafe { ManuallyDrop::new(std::fs::File::from_raw_fd(1)) }
}

fn main() {
    z85_rs::common::reset_sigpipe();

    let tool = gnu_name(env!("CARGO_BIN_NAME"));
    let cli = Cli::parse();

    let filename = cli.file.as_deref().unwrap_or("-");

    #[cfg(unix)]
    let mut raw = raw_stdout();

    #[cfg(unix)]
    let result = if filename == "-" {
        process_stdin(&cli, &mut *raw)
    } else {
        process_file(filename, &cli, &mut *raw)
    };
    #[cfg(not(unix))]
    let result = {
        let stdout = io::stdout();
        let mut out = io::BufWriter::with_capacity(8 * 1024 * 1024, stdout.lock());
        let r = if filename == "-" {
            process_stdin(&cli, &mut out)
        } else {
            process_file(filename, &cli, &mut out)
        };
        if let Err(e) = out.flush()
            && e.kind() != io::ErrorKind::BrokenPipe
        {
            eprintln!("{}: {}", tool, io_error_msg(&e));
            process::exit(1);
        }
        r
    };

    if let Err(e) = result {
        if e.kind() == io::ErrorKind::BrokenPipe {
            process::exit(0);
        }
        if filename != "-" {
            eprintln!("{}: {}: {}", tool, filename, io_error_msg(&e));
        } else {
            eprintln!("{}: {}", tool, io_error_msg(&e));
        }
        process::exit(1);
    }
}

/// Try to mmap stdin as read-only if it's a regular file (e.g., shell redirect `< file`).
#[cfg(unix)]
fn try_mmap_stdin() -> Option<memmap2::Mmap> {
    use std::os::unix::io::AsRawFd;
    let stdin = io::stdin();
    let fd = stdin.as_raw_fd();

    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    if unsafe { libc::fstat(fd, &mut stat) } != 0 {
        return None;
    }
    if (stat.st_mode & libc::S_IFMT) != libc::S_IFREG || stat.st_size <= 0 {
        return None;
    }

    // The File must not close fd 0 when dropped.
    let file = ManuallyDrop::new(unsafe { std::fs::File::from_raw_fd(fd) });
    let mmap = unsafe { MmapOptions::new().populate().map(&*file) }.ok();
    #[cfg(target_os = "linux")]
    if let Some(ref m) = mmap {
        let _ = m.advise(memmap2::Advice::Sequential);
    }
    mmap
}

fn process_stdin(cli: &Cli, out: &mut impl Write) -> io::Result<()> {
    #[cfg(unix)]
    if let Some(mmap) = try_mmap_stdin() {
        return if cli.decode {
            z85::decode_to_writer(&mmap, cli.ignore_garbage, out)
        } else {
            z85::encode_to_writer(&mmap, cli.wrap, out)
        };
    }

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    if cli.decode {
        z85::decode_stream(&mut reader, cli.ignore_garbage, out)
    } else {
        z85::encode_stream(&mut reader, cli.wrap, out)
    }
}

fn process_file(filename: &str, cli: &Cli, out: &mut impl Write) -> io::Result<()> {
    let data = read_file(Path::new(filename))?;
    if cli.decode {
        z85::decode_to_writer(&data, cli.ignore_garbage, out)
    } else {
        z85::encode_to_writer(&data, cli.wrap, out)
    }
}
