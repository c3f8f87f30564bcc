use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::tempdir;
use timeplot_core::wav::{self, GENERATED_NAME_PREFIX};
use timeplot_core::AudioBuffer;

/// Generated names are relative to the working directory, which is process wide.
static WORKING_DIR: Mutex<()> = Mutex::new(());

/// Restores the previous working directory when dropped.
struct ChangedDir(PathBuf);

impl ChangedDir {
    fn enter(dir: &Path) -> std::io::Result<Self> {
        let previous = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(Self(previous))
    }
}

impl Drop for ChangedDir {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.0);
    }
}

#[test]
fn unnamed_saves_count_up_from_zero() -> Result<(), Box<dyn Error>> {
    let _lock = WORKING_DIR.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let work_dir = tempdir()?;
    let audio = AudioBuffer::from_channels(vec![vec![0.0, 0.25, -0.25, 0.5]])?;

    let (first, second) = {
        let _cwd = ChangedDir::enter(work_dir.path())?;
        let first = wav::save_wav(&audio, None, 16, 8_000)?;
        let second = wav::save_wav(&audio, None, 16, 8_000)?;
        (first, second)
    };

    assert_eq!(first, PathBuf::from(format!("{GENERATED_NAME_PREFIX}0.wav")));
    assert_eq!(second, PathBuf::from(format!("{GENERATED_NAME_PREFIX}1.wav")));
    assert_eq!(first, PathBuf::from("timeplot_output_0.wav"));

    for name in [&first, &second] {
        let (rate, decoded) = wav::read_wav(work_dir.path().join(name))?;
        assert_eq!(rate, 8_000);
        assert_eq!(decoded.frames(), 4);
    }

    work_dir.close()?;
    Ok(())
}
