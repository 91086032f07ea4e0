use crate::core::contact::data::ForceData;
use crate::core::models::particle::{Particle, ParticleRecord};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Particle tag {0} appears more than once")]
    DuplicateTag(u64),
    #[error("Particle {tag} has invalid type 0 (types start at 1)")]
    InvalidType { tag: u64 },
    #[error("Particle {tag} has non-positive radius {radius}")]
    InvalidRadius { tag: u64, radius: f64 },
    #[error("Result table has {particles} particles but {forces} force entries")]
    LengthMismatch { particles: usize, forces: usize },
}

/// Reads a particle table (`tag,type,x,y,z,...,radius[,smoothing_length,group]`).
pub fn read_particles<R: Read>(reader: R) -> Result<Vec<Particle>, TableError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut seen = HashSet::new();
    let mut particles = Vec::new();
    for record in csv_reader.deserialize::<ParticleRecord>() {
        let record = record?;
        if record.particle_type == 0 {
            return Err(TableError::InvalidType { tag: record.tag });
        }
        if record.radius <= 0.0 {
            return Err(TableError::InvalidRadius {
                tag: record.tag,
                radius: record.radius,
            });
        }
        if !seen.insert(record.tag) {
            return Err(TableError::DuplicateTag(record.tag));
        }
        particles.push(Particle::from(record));
    }
    Ok(particles)
}

pub fn read_particles_from_path(path: &Path) -> Result<Vec<Particle>, TableError> {
    let file = std::fs::File::open(path).map_err(|e| TableError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    read_particles(std::io::BufReader::new(file))
}

pub fn write_particles<W: Write>(writer: W, particles: &[Particle]) -> Result<(), TableError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for particle in particles {
        csv_writer.serialize(ParticleRecord::from(particle))?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ResultRow {
    tag: u64,
    fx: f64,
    fy: f64,
    fz: f64,
    tx: f64,
    ty: f64,
    tz: f64,
}

/// Writes one row of accumulated force and torque per particle.
pub fn write_results<W: Write>(
    writer: W,
    particles: &[Particle],
    forces: &[ForceData],
) -> Result<(), TableError> {
    if particles.len() != forces.len() {
        return Err(TableError::LengthMismatch {
            particles: particles.len(),
            forces: forces.len(),
        });
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    for (particle, force) in particles.iter().zip(forces) {
        csv_writer.serialize(ResultRow {
            tag: particle.tag,
            fx: force.delta_f.x,
            fy: force.delta_f.y,
            fz: force.delta_f.z,
            tx: force.delta_torque.x,
            ty: force.delta_torque.y,
            tz: force.delta_torque.z,
        })?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};
    use std::fs;
    use tempfile::tempdir;

    const TABLE: &str = "\
tag,type,x,y,z,vx,vy,vz,wx,wy,wz,radius,smoothing_length,group
1,1,0.0,0.0,0.0,1.0,0.0,0.0,0.0,0.0,0.0,0.5,0.6,1
2,2,1.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,2.0,0.5,,
";

    #[test]
    fn read_particles_parses_rows_and_optional_columns() {
        let particles = read_particles(TABLE.as_bytes()).unwrap();
        assert_eq!(particles.len(), 2);
        assert_eq!(particles[0].velocity, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(particles[0].smoothing_length, 0.6);
        assert_eq!(particles[1].particle_type, 2);
        assert_eq!(particles[1].smoothing_length, 0.5);
        assert_eq!(particles[1].omega, Vector3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn minimal_columns_are_enough() {
        let particles = read_particles("tag,type,x,y,z,radius\n3,1,1,2,3,0.1\n".as_bytes()).unwrap();
        assert_eq!(particles[0].position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(particles[0].velocity, Vector3::zeros());
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        let data = "tag,type,x,y,z,radius\n1,1,0,0,0,1\n1,1,1,0,0,1\n";
        assert!(matches!(
            read_particles(data.as_bytes()),
            Err(TableError::DuplicateTag(1))
        ));
    }

    #[test]
    fn type_zero_and_bad_radius_are_rejected() {
        assert!(matches!(
            read_particles("tag,type,x,y,z,radius\n1,0,0,0,0,1\n".as_bytes()),
            Err(TableError::InvalidType { tag: 1 })
        ));
        assert!(matches!(
            read_particles("tag,type,x,y,z,radius\n1,1,0,0,0,0\n".as_bytes()),
            Err(TableError::InvalidRadius { tag: 1, .. })
        ));
    }

    #[test]
    fn malformed_rows_are_csv_errors() {
        assert!(matches!(
            read_particles("tag,type,x,y,z,radius\n1,1,zero,0,0,1\n".as_bytes()),
            Err(TableError::Csv(_))
        ));
    }

    #[test]
    fn written_particles_can_be_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("particles.csv");
        let original = read_particles(TABLE.as_bytes()).unwrap();
        write_particles(fs::File::create(&path).unwrap(), &original).unwrap();
        assert_eq!(read_particles_from_path(&path).unwrap(), original);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_particles_from_path(&dir.path().join("none.csv")),
            Err(TableError::Io { .. })
        ));
    }

    #[test]
    fn write_results_emits_one_row_per_particle() {
        let particles = read_particles(TABLE.as_bytes()).unwrap();
        let forces = vec![
            ForceData {
                delta_f: Vector3::new(1.0, 0.0, 0.0),
                delta_torque: Vector3::new(0.0, 0.0, -0.5),
            },
            ForceData::default(),
        ];
        let mut out = Vec::new();
        write_results(&mut out, &particles, &forces).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "tag,fx,fy,fz,tx,ty,tz");
        assert_eq!(lines[1], "1,1.0,0.0,0.0,0.0,0.0,-0.5");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn write_results_rejects_length_mismatch() {
        let particles = read_particles(TABLE.as_bytes()).unwrap();
        assert!(matches!(
            write_results(Vec::new(), &particles, &[]),
            Err(TableError::LengthMismatch { .. })
        ));
    }
}
