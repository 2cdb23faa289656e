use std::error::Error;
use std::io;

use log::info;
use ordered_float::NotNan;
use permat::{
    barcode::filtration_bars,
    columns::{HeapColumn, VectorColumn},
    fields::{CoefficientField, MultiField, Z2Field},
    matrices::{BaseMatrix, ChainMatrix, PersistenceMatrix, RuMatrix},
    Dimension, Index,
};

// Pairs closer than this are reported as noise
const MIN_PERSISTENCE: f64 = 0.01;

/// One face of the input filtration.
struct Face {
    filtration: NotNan<f64>,
    dimension: Dimension,
    boundary: Vec<Index>,
}

/// Reads `filtration,dimension,face,...` records, faces referring to earlier records.
fn read_faces() -> Result<Vec<Face>, Box<dyn Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(io::stdin());
    let mut faces = vec![];
    for record in rdr.records() {
        let record = record?;
        let mut fields = record.iter().filter(|field| !field.is_empty());
        let filtration = fields.next().ok_or("Missing filtration value")?;
        let dimension = fields.next().ok_or("Missing dimension")?;
        faces.push(Face {
            filtration: NotNan::new(filtration.parse::<f64>()?)?,
            dimension: dimension.parse()?,
            boundary: fields.map(str::parse).collect::<Result<_, _>>()?,
        });
    }
    Ok(faces)
}

/// The `i`-th face of a boundary is signed `(-1)^i`.
fn oriented(boundary: &[Index], minus_one: u64) -> Vec<(Index, u64)> {
    boundary
        .iter()
        .enumerate()
        .map(|(i, &face)| (face, if i % 2 == 0 { 1 } else { minus_one }))
        .collect()
}

fn run<F, M>(mut matrix: M, minus_one: u64, faces: &[Face]) -> Result<(), Box<dyn Error>>
where
    F: CoefficientField,
    M: PersistenceMatrix<F>,
{
    for face in faces {
        matrix.insert_face(oriented(&face.boundary, minus_one), Some(face.dimension))?;
    }
    info!(
        "Reduced {} faces, maximal dimension {:?}",
        matrix.number_of_columns(),
        matrix.max_dimension()
    );

    let filtration: Vec<NotNan<f64>> = faces.iter().map(|face| face.filtration).collect();
    let mut bars = filtration_bars(&matrix.barcode()?, &filtration)?;
    bars.sort();

    println!("Essential:");
    for bar in bars.iter().filter(|bar| bar.death.is_none()) {
        println!(" dim={}, f=({}, ∞)", bar.dimension, bar.birth);
    }
    println!("\nPairings:");
    for bar in bars.iter() {
        let (Some(death), Some(persistence)) = (bar.death, bar.persistence()) else {
            continue;
        };
        if persistence > MIN_PERSISTENCE {
            println!(" dim={}, f=({}, {death})", bar.dimension, bar.birth);
        }
    }
    Ok(())
}

fn run_with_field<F: CoefficientField>(
    representation: &str,
    field: F,
    characteristic: u32,
    faces: &[Face],
) -> Result<(), Box<dyn Error>> {
    let minus_one = u64::from(characteristic) - 1;
    match representation {
        "base" => run(BaseMatrix::<F, HeapColumn<F>>::new(field), minus_one, faces),
        "ru" => run(RuMatrix::<F, VectorColumn<F>>::new(field), minus_one, faces),
        "chain" => run(ChainMatrix::<F, VectorColumn<F>>::new(field), minus_one, faces),
        other => Err(format!("Unknown representation {other}, expected base, ru or chain").into()),
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let representation = args.next().unwrap_or_else(|| "ru".to_owned());
    let characteristic: u32 = args
        .next()
        .map(|arg| {
            arg.parse()
                .expect("Second argument should be the characteristic of the field")
        })
        .unwrap_or(2);

    let faces = read_faces()?;
    info!("Read {} faces", faces.len());

    if characteristic == 2 {
        run_with_field(&representation, Z2Field::new(), characteristic, &faces)
    } else {
        let field = MultiField::initialize(characteristic, characteristic)?;
        run_with_field(&representation, field, characteristic, &faces)
    }
}
