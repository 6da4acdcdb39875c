use std::path::Path;
use std::time::{Duration, Instant};

/// Write a scripted "audio" file understood by [`super::reader::ScriptedReader`].
pub fn write_song(path: &Path, title: &str, album: &str, artist: &str) {
    std::fs::write(path, format!("title={title}\nalbum={album}\nartist={artist}\n")).unwrap();
}

#[cfg(unix)]
pub fn set_file_times(path: &Path, seconds: i64, nanos: i64) {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).unwrap();
    let times = [
        libc::timespec {
            tv_sec: seconds,
            tv_nsec: nanos,
        },
        libc::timespec {
            tv_sec: seconds,
            tv_nsec: nanos,
        },
    ];
    let result = unsafe { libc::utimensat(libc::AT_FDCWD, c_path.as_ptr(), times.as_ptr(), 0) };
    assert_eq!(result, 0);
}

#[cfg(not(unix))]
pub fn set_file_times(path: &Path, seconds: i64, nanos: i64) {
    let time = std::time::UNIX_EPOCH
        + Duration::from_secs(seconds as u64)
        + Duration::from_nanos(nanos as u64);
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

/// Poll `check` until it holds or `timeout` passes; returns the final result.
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}
