//! Persistence of trajectories and restart state.
//!
//! Two stores are kept, both in NumPy formats:
//! - the primary [`Dataset`], a directory holding run metadata and the relaxed
//!   initial state in `meta.npz` plus one complex64 `.npy` slice per snapshot
//!   under `wavefunction/psi/`; stacking the slices along a trailing axis gives
//!   the `[nx, ny, K]` trajectory;
//! - the single-slot [`CheckpointFile`], an `.npz` archive overwritten every
//!   checkpoint interval.
//!
//! Every file is first written beside its destination and then renamed into
//! place, so an interrupted write never clobbers earlier output.
//!
//! [`Archive`] bundles both behind the restore/snapshot/checkpoint interface
//! used by the driver, adding optional retries for failed writes.

use std::{
    fs,
    io::{ Read, Seek },
    path::{ Path, PathBuf },
    thread,
    time::Duration,
};
use log::{ debug, info, warn };
use ndarray as nd;
use ndarray_npy::{ read_npy, write_npy, NpzReader, NpzWriter, ReadableElement };
use num_complex::{ Complex32 as C32, Complex64 as C64 };
use crate::{
    Arr2,
    config::{ OutputParams, TimeParams },
    error::{ RestoreError, StorageError },
    grid::Grid,
    utils::to_single,
};

pub type SResult<T> = Result<T, StorageError>;
pub type LResult<T> = Result<T, RestoreError>;

const META_FILE: &str = "meta.npz";
const FRAME_DIR: &str = "wavefunction/psi";

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

// write an .npz archive via a temporary file and an atomic rename
fn write_npz_atomic<F>(path: &Path, build: F) -> SResult<()>
where F: FnOnce(&mut NpzWriter<fs::File>) -> Result<(), ndarray_npy::WriteNpzError>
{
    let tmp = tmp_path(path);
    let file = fs::File::create(&tmp).map_err(StorageError::write(&tmp))?;
    let mut npz = NpzWriter::new(file);
    build(&mut npz).map_err(StorageError::write(&tmp))?;
    let file = npz.finish().map_err(StorageError::write(&tmp))?;
    file.sync_all().map_err(StorageError::write(&tmp))?;
    fs::rename(&tmp, path).map_err(StorageError::write(path))?;
    Ok(())
}

// look up an entry by the name it was written under, with or without the
// `.npy` suffix the writer appends
fn npz_entry<R, A, D>(npz: &mut NpzReader<R>, field: &'static str)
    -> LResult<nd::Array<A, D>>
where
    R: Read + Seek,
    A: ReadableElement,
    D: nd::Dimension,
{
    let suffixed = format!("{}.npy", field);
    let name
        = npz.names()?.into_iter()
        .find(|n| n == field || *n == suffixed)
        .ok_or_else(|| RestoreError::Malformed {
            field, reason: "entry not present".to_string() })?;
    Ok(npz.by_name(&name)?)
}

fn check_shape<A>(a: &nd::Array2<A>, grid: &Grid, field: &'static str)
    -> LResult<()>
{
    (a.dim() == grid.shape()).then_some(())
        .ok_or_else(|| RestoreError::Malformed {
            field,
            reason: format!(
                "expected shape {:?}, found {:?}", grid.shape(), a.dim()),
        })
}

/// Fixed metadata and initial state of a run, as stored in `meta.npz`.
#[derive(Clone, Debug)]
pub struct Meta {
    /// `grid/x`
    pub x: nd::Array1<f64>,
    /// `grid/y`
    pub y: nd::Array1<f64>,
    /// `time/Nt`
    pub nt: u64,
    /// `time/dt`
    pub dt: f64,
    /// `time/Nframe`
    pub nframe: u64,
    /// `initial_state/psi`, real space, double precision
    pub initial_psi: nd::Array2<C64>,
    /// `initial_state/atom_number`
    pub atom_number: f64,
}

/// The primary, append-only trajectory dataset.
#[derive(Clone, Debug)]
pub struct Dataset {
    root: PathBuf,
}

impl Dataset {
    /// Create a new dataset at `root`, replacing any previous trajectory
    /// there, and record the run metadata and the relaxed initial state
    /// `psi0` (real space).
    pub fn create<P, S>(
        root: P,
        grid: &Grid,
        time: &TimeParams,
        psi0: &Arr2<S>,
        atom_number: f64,
    ) -> SResult<Self>
    where
        P: AsRef<Path>,
        S: nd::Data<Elem = C64>,
    {
        let root = root.as_ref().to_path_buf();
        let frames = root.join(FRAME_DIR);
        if frames.exists() {
            fs::remove_dir_all(&frames).map_err(StorageError::write(&frames))?;
        }
        fs::create_dir_all(&frames).map_err(StorageError::write(&frames))?;
        write_npz_atomic(&root.join(META_FILE), |npz| {
            npz.add_array("grid/x", &grid.x)?;
            npz.add_array("grid/y", &grid.y)?;
            npz.add_array("time/Nt", &nd::arr0(time.nt))?;
            npz.add_array("time/dt", &nd::arr0(time.dt))?;
            npz.add_array("time/Nframe", &nd::arr0(time.nframe))?;
            npz.add_array("initial_state/psi", psi0)?;
            npz.add_array("initial_state/atom_number", &nd::arr0(atom_number))?;
            Ok(())
        })?;
        Ok(Self { root })
    }

    /// Open an existing dataset.
    pub fn open<P>(root: P) -> LResult<Self>
    where P: AsRef<Path>
    {
        let root = root.as_ref().to_path_buf();
        if !root.join(META_FILE).is_file() {
            return Err(RestoreError::MissingDataset(root));
        }
        Ok(Self { root })
    }

    /// Location of the dataset.
    pub fn root(&self) -> &Path { &self.root }

    /// Path of snapshot slice `k`.
    pub fn frame_path(&self, k: u64) -> PathBuf {
        self.root.join(FRAME_DIR).join(format!("{:08}.npy", k))
    }

    /// Number of snapshots `K`, i.e. the length of the contiguous run of
    /// slices starting at index 0.
    pub fn len(&self) -> u64 {
        (0..).take_while(|k| self.frame_path(*k).is_file()).count() as u64
    }

    /// Return `true` if no snapshot has been written.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Store the real-space wavefunction `psi` as slice `k`, in single
    /// precision.
    pub fn append<S>(&self, k: u64, psi: &Arr2<S>) -> SResult<()>
    where S: nd::Data<Elem = C64>
    {
        let path = self.frame_path(k);
        let tmp = tmp_path(&path);
        write_npy(&tmp, &to_single(psi)).map_err(StorageError::write(&tmp))?;
        fs::rename(&tmp, &path).map_err(StorageError::write(&path))?;
        Ok(())
    }

    /// Remove every slice with index `k` or greater, returning how many were
    /// removed.
    pub fn truncate(&self, k: u64) -> std::io::Result<u64> {
        let mut removed: u64 = 0;
        for entry in fs::read_dir(self.root.join(FRAME_DIR))? {
            let path = entry?.path();
            let index
                = path.file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.split('.').next())
                .and_then(|stem| stem.parse::<u64>().ok());
            if index.is_some_and(|idx| idx >= k) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Read snapshot slice `k`.
    pub fn read_frame(&self, k: u64) -> LResult<nd::Array2<C32>> {
        Ok(read_npy(self.frame_path(k))?)
    }

    /// Read every snapshot into a single `[nx, ny, K]` array.
    pub fn read_trajectory(&self) -> LResult<nd::Array3<C32>> {
        let frames: Vec<nd::Array2<C32>>
            = (0..self.len())
            .map(|k| self.read_frame(k))
            .collect::<LResult<_>>()?;
        if frames.is_empty() {
            let meta = self.read_meta()?;
            return Ok(nd::Array3::zeros((meta.x.len(), meta.y.len(), 0)));
        }
        let views: Vec<nd::ArrayView2<C32>>
            = frames.iter().map(|f| f.view()).collect();
        nd::stack(nd::Axis(2), &views)
            .map_err(|err| RestoreError::Malformed {
                field: "wavefunction/psi", reason: err.to_string() })
    }

    /// Read the run metadata and initial state.
    pub fn read_meta(&self) -> LResult<Meta> {
        let file = fs::File::open(self.root.join(META_FILE))?;
        let mut npz = NpzReader::new(file)?;
        Ok(Meta {
            x: npz_entry(&mut npz, "grid/x")?,
            y: npz_entry(&mut npz, "grid/y")?,
            nt: npz_entry::<_, u64, nd::Ix0>(&mut npz, "time/Nt")?.into_scalar(),
            dt: npz_entry::<_, f64, nd::Ix0>(&mut npz, "time/dt")?.into_scalar(),
            nframe:
                npz_entry::<_, u64, nd::Ix0>(&mut npz, "time/Nframe")?
                .into_scalar(),
            initial_psi: npz_entry(&mut npz, "initial_state/psi")?,
            atom_number:
                npz_entry::<_, f64, nd::Ix0>(&mut npz, "initial_state/atom_number")?
                .into_scalar(),
        })
    }
}

/// Contents of a checkpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    /// Elapsed simulated time
    pub time: f64,
    /// Spectral wavefunction, single precision
    pub psi_k: nd::Array2<C32>,
    /// Snapshot counter
    pub index: u64,
    /// Number of real-time steps completed
    pub step: u64,
}

/// The single-slot restart file.
#[derive(Clone, Debug)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    pub fn new<P>(path: P) -> Self
    where P: AsRef<Path>
    {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn exists(&self) -> bool { self.path.is_file() }

    /// Remove the checkpoint and any partially written copy of it.
    pub fn clear(&self) -> SResult<()> {
        for path in [self.path.clone(), tmp_path(&self.path)] {
            match fs::remove_file(&path) {
                Ok(()) => { debug!("removed stale {}", path.display()); },
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => { },
                Err(err) => { return Err(StorageError::write(&path)(err)); },
            }
        }
        Ok(())
    }

    /// Overwrite the checkpoint with `(time, psi_k, index, step)`. `psi_k` is
    /// truncated to single precision.
    pub fn write<S>(&self, time: f64, psi_k: &Arr2<S>, index: u64, step: u64)
        -> SResult<()>
    where S: nd::Data<Elem = C64>
    {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(StorageError::write(dir))?;
            }
        }
        let psi_k = to_single(psi_k);
        write_npz_atomic(&self.path, |npz| {
            npz.add_array("time", &nd::arr0(time))?;
            npz.add_array("wavefunction/psi_k", &psi_k)?;
            npz.add_array("array_index", &nd::arr0(index))?;
            npz.add_array("step", &nd::arr0(step))?;
            Ok(())
        })
    }

    /// Read the checkpoint, checking it against `grid`.
    pub fn restore(&self, grid: &Grid) -> LResult<Checkpoint> {
        if !self.exists() {
            return Err(RestoreError::MissingCheckpoint(self.path.clone()));
        }
        let file = fs::File::open(&self.path)?;
        let mut npz = NpzReader::new(file)?;
        let time
            = npz_entry::<_, f64, nd::Ix0>(&mut npz, "time")?.into_scalar();
        let psi_k: nd::Array2<C32> = npz_entry(&mut npz, "wavefunction/psi_k")?;
        check_shape(&psi_k, grid, "wavefunction/psi_k")?;
        let index
            = npz_entry::<_, u64, nd::Ix0>(&mut npz, "array_index")?
            .into_scalar();
        let step
            = npz_entry::<_, u64, nd::Ix0>(&mut npz, "step")?.into_scalar();
        if !time.is_finite() {
            return Err(RestoreError::Malformed {
                field: "time", reason: format!("non-finite value {}", time) });
        }
        Ok(Checkpoint { time, psi_k, index, step })
    }
}

/// Restore/snapshot/checkpoint interface over a [`Dataset`] and a
/// [`CheckpointFile`].
#[derive(Clone, Debug)]
pub struct Archive {
    pub dataset: Dataset,
    pub backup: CheckpointFile,
    retries: u32,
    backoff_ms: u64,
}

impl Archive {
    pub fn new(dataset: Dataset, backup: CheckpointFile, output: &OutputParams)
        -> Self
    {
        Self {
            dataset,
            backup,
            retries: output.write_retries,
            backoff_ms: output.retry_backoff_ms,
        }
    }

    /// Create a fresh dataset as described by `output` and attach the
    /// checkpoint file to it. A checkpoint left over from an earlier run is
    /// removed first.
    pub fn create<S>(
        output: &OutputParams,
        grid: &Grid,
        time: &TimeParams,
        psi0: &Arr2<S>,
        atom_number: f64,
    ) -> SResult<Self>
    where S: nd::Data<Elem = C64>
    {
        let backup = CheckpointFile::new(&output.backup_path);
        backup.clear()?;
        let dataset
            = Dataset::create(&output.data_path, grid, time, psi0, atom_number)?;
        info!("created dataset at {}", output.data_path.display());
        Ok(Self::new(dataset, backup, output))
    }

    /// Open the existing dataset and checkpoint described by `output`.
    pub fn open(output: &OutputParams) -> LResult<Self> {
        let backup = CheckpointFile::new(&output.backup_path);
        if !backup.exists() {
            return Err(RestoreError::MissingCheckpoint(output.backup_path.clone()));
        }
        let dataset = Dataset::open(&output.data_path)?;
        Ok(Self::new(dataset, backup, output))
    }

    fn with_retries<F>(&self, what: &str, mut op: F) -> SResult<()>
    where F: FnMut() -> SResult<()>
    {
        let mut attempt: u32 = 0;
        loop {
            match op() {
                Ok(()) => { return Ok(()); },
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "{} failed: {}; retry {}/{}",
                        what, err, attempt, self.retries,
                    );
                    thread::sleep(
                        Duration::from_millis(self.backoff_ms * attempt as u64));
                },
                Err(err) => { return Err(err); },
            }
        }
    }

    /// Read the checkpoint and discard any snapshots written after it.
    pub fn restore(&self, grid: &Grid) -> LResult<Checkpoint> {
        let checkpoint = self.backup.restore(grid)?;
        let len = self.dataset.len();
        if checkpoint.index > len {
            return Err(RestoreError::Malformed {
                field: "array_index",
                reason: format!(
                    "checkpoint expects {} snapshots, dataset holds {}",
                    checkpoint.index, len),
            });
        }
        let stale = self.dataset.truncate(checkpoint.index)?;
        if stale > 0 {
            info!("discarded {} snapshots newer than the checkpoint", stale);
        }
        Ok(checkpoint)
    }

    /// Append real-space `psi` to the trajectory at index `k`.
    pub fn snapshot<S>(&self, k: u64, psi: &Arr2<S>) -> SResult<()>
    where S: nd::Data<Elem = C64>
    {
        self.with_retries("snapshot", || self.dataset.append(k, psi))?;
        debug!("wrote snapshot {}", k);
        Ok(())
    }

    /// Overwrite the checkpoint.
    pub fn checkpoint<S>(&self, time: f64, psi_k: &Arr2<S>, k: u64, step: u64)
        -> SResult<()>
    where S: nd::Data<Elem = C64>
    {
        self.with_retries(
            "checkpoint", || self.backup.write(time, psi_k, k, step))?;
        info!("checkpoint at step {} (t = {:.4}, k = {})", step, time, k);
        Ok(())
    }
}
