use std::collections::BTreeMap;

use arrow_array::cast::AsArray;
use arrow_array::types::{Float64Type, Int32Type, Int64Type};
use arrow_array::{Array, RecordBatch, StructArray};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::event::{Event, Particle, RunInfo, Vertex};
use crate::extra::ExtraAttributes;
use crate::file::File;
use crate::formats::FormatError;
use crate::traits::EventSource;
use crate::vertex;

use super::schema::decode_run_info;

/// Reads both Parquet layouts (§4.6), telling them apart by the presence
/// of a `particles` column. The whole file's row groups are decoded up
/// front into an in-memory queue of events: unlike the text formats,
/// Parquet's own row-group buffering already materializes more than one
/// event at a time, so nothing is gained by re-deriving a lazy decode on
/// top of it.
pub struct ParquetReader {
    run_info: RunInfo,
    events: std::collections::VecDeque<Event>,
}

fn framing(detail: String) -> FormatError {
    FormatError::Framing { format: "parquet", detail }
}

impl ParquetReader {
    pub fn new(source: File) -> Result<Self, FormatError> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(source.0)
            .map_err(|e| framing(e.to_string()))?;
        let md = builder
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .cloned()
            .unwrap_or_default();
        let md: BTreeMap<String, String> = md
            .into_iter()
            .filter_map(|kv| kv.value.map(|v| (kv.key, v)))
            .collect();
        let run_info = decode_run_info(&md);

        let schema = builder.schema().clone();
        let columnar = schema.column_with_name("particles").is_some();
        let arrow_reader = builder.build().map_err(|e| framing(e.to_string()))?;

        let mut events = std::collections::VecDeque::new();
        let mut carry: Option<PartialEvent> = None;
        for batch in arrow_reader {
            let batch = batch.map_err(|e| framing(e.to_string()))?;
            if columnar {
                decode_columnar_batch(&batch, &mut events)?;
            } else {
                decode_flat_batch(&batch, &mut carry, &mut events)?;
            }
        }
        if let Some(partial) = carry {
            events.push_back(partial.finish());
        }

        Ok(ParquetReader { run_info, events })
    }
}

impl EventSource for ParquetReader {
    fn run_info(&self) -> RunInfo {
        self.run_info.clone()
    }
}

impl Iterator for ParquetReader {
    type Item = Result<Event, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.events.pop_front().map(Ok)
    }
}

fn opt_string(arr: &arrow_array::StringArray, i: usize) -> Option<String> {
    if arr.is_null(i) {
        None
    } else {
        Some(arr.value(i).to_string())
    }
}

fn parse_extra(raw: Option<String>) -> ExtraAttributes {
    raw.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default()
}

struct PartialEvent {
    event_number: i64,
    process_id: i32,
    scale: f64,
    alpha_qed: f64,
    alpha_qcd: f64,
    weights: Vec<f64>,
    extra: ExtraAttributes,
    particles: Vec<Particle>,
    prod_vertex: BTreeMap<i32, (f64, f64, f64, f64)>,
    end_vertex: BTreeMap<i32, (f64, f64, f64, f64)>,
    next_vertex_barcode: i32,
}

impl PartialEvent {
    fn finish(mut self) -> Event {
        let mut vertices = Vec::new();
        let mut assign = |positions: &BTreeMap<i32, (f64, f64, f64, f64)>,
                           particles: &mut [Particle],
                           is_prod: bool,
                           next_barcode: &mut i32,
                           vertices: &mut Vec<Vertex>| {
            for (&placeholder_barcode, &(x, y, z, t)) in positions {
                let barcode = *next_barcode;
                *next_barcode -= 1;
                vertices.push(Vertex {
                    barcode,
                    x,
                    y,
                    z,
                    t,
                    incoming: Vec::new(),
                    outgoing: Vec::new(),
                });
                for p in particles.iter_mut() {
                    if is_prod && p.vertex_barcode == placeholder_barcode {
                        p.vertex_barcode = barcode;
                    }
                    if !is_prod && p.end_vertex_barcode == placeholder_barcode {
                        p.end_vertex_barcode = barcode;
                    }
                }
            }
        };
        assign(
            &self.prod_vertex,
            &mut self.particles,
            true,
            &mut self.next_vertex_barcode,
            &mut vertices,
        );
        assign(
            &self.end_vertex,
            &mut self.particles,
            false,
            &mut self.next_vertex_barcode,
            &mut vertices,
        );

        let mut event = Event {
            event_number: self.event_number,
            particles: self.particles,
            vertices,
            weights: self.weights,
            process_id: self.process_id,
            scale: self.scale,
            alpha_qed: self.alpha_qed,
            alpha_qcd: self.alpha_qcd,
            n_particles: 0,
            extra: self.extra,
        };
        event.n_particles = event.particles.len() as i32;
        vertex::reconstruct(&mut event);
        event
    }
}

fn decode_flat_batch(
    batch: &RecordBatch,
    carry: &mut Option<PartialEvent>,
    out: &mut std::collections::VecDeque<Event>,
) -> Result<(), FormatError> {
    let event_number = batch.column_by_name("event_number").unwrap().as_primitive::<Int64Type>();
    let process_id = batch.column_by_name("process_id").unwrap().as_primitive::<Int32Type>();
    let scale = batch.column_by_name("scale").unwrap().as_primitive::<Float64Type>();
    let alpha_qed = batch.column_by_name("alpha_qed").unwrap().as_primitive::<Float64Type>();
    let alpha_qcd = batch.column_by_name("alpha_qcd").unwrap().as_primitive::<Float64Type>();
    let weights = batch.column_by_name("weights").unwrap().as_list::<i32>();
    let event_extra_json = batch.column_by_name("event_extra_json").unwrap().as_string::<i32>();

    let pdg_id = batch.column_by_name("pdg_id").unwrap().as_primitive::<Int32Type>();
    let status = batch.column_by_name("status").unwrap().as_primitive::<Int32Type>();
    let mother1 = batch.column_by_name("mother1").unwrap().as_primitive::<Int32Type>();
    let mother2 = batch.column_by_name("mother2").unwrap().as_primitive::<Int32Type>();
    let color1 = batch.column_by_name("color1").unwrap().as_primitive::<Int32Type>();
    let color2 = batch.column_by_name("color2").unwrap().as_primitive::<Int32Type>();
    let px = batch.column_by_name("px").unwrap().as_primitive::<Float64Type>();
    let py = batch.column_by_name("py").unwrap().as_primitive::<Float64Type>();
    let pz = batch.column_by_name("pz").unwrap().as_primitive::<Float64Type>();
    let energy = batch.column_by_name("energy").unwrap().as_primitive::<Float64Type>();
    let mass = batch.column_by_name("mass").unwrap().as_primitive::<Float64Type>();
    let spin = batch.column_by_name("spin").unwrap().as_primitive::<Float64Type>();
    let barcode = batch.column_by_name("barcode").unwrap().as_primitive::<Int32Type>();
    let vertex_barcode = batch.column_by_name("vertex_barcode").unwrap().as_primitive::<Int32Type>();
    let end_vertex_barcode = batch.column_by_name("end_vertex_barcode").unwrap().as_primitive::<Int32Type>();
    let attributes_json = batch.column_by_name("attributes_json").unwrap().as_string::<i32>();
    let prod_vx = batch.column_by_name("prod_vx").unwrap().as_primitive::<Float64Type>();
    let prod_vy = batch.column_by_name("prod_vy").unwrap().as_primitive::<Float64Type>();
    let prod_vz = batch.column_by_name("prod_vz").unwrap().as_primitive::<Float64Type>();
    let prod_vt = batch.column_by_name("prod_vt").unwrap().as_primitive::<Float64Type>();
    let end_vx = batch.column_by_name("end_vx").unwrap().as_primitive::<Float64Type>();
    let end_vy = batch.column_by_name("end_vy").unwrap().as_primitive::<Float64Type>();
    let end_vz = batch.column_by_name("end_vz").unwrap().as_primitive::<Float64Type>();
    let end_vt = batch.column_by_name("end_vt").unwrap().as_primitive::<Float64Type>();

    for i in 0..batch.num_rows() {
        if carry.as_ref().map(|c| c.event_number) != Some(event_number.value(i)) {
            if let Some(partial) = carry.take() {
                out.push_back(partial.finish());
            }
            *carry = Some(PartialEvent {
                event_number: event_number.value(i),
                process_id: process_id.value(i),
                scale: scale.value(i),
                alpha_qed: alpha_qed.value(i),
                alpha_qcd: alpha_qcd.value(i),
                weights: weights
                    .value(i)
                    .as_primitive::<Float64Type>()
                    .values()
                    .to_vec(),
                extra: parse_extra(opt_string(event_extra_json, i)),
                particles: Vec::new(),
                prod_vertex: BTreeMap::new(),
                end_vertex: BTreeMap::new(),
                next_vertex_barcode: -1,
            });
        }
        let current = carry.as_mut().unwrap();

        let this_barcode = barcode.value(i);
        let this_vertex_barcode = vertex_barcode.value(i);
        let this_end_vertex_barcode = end_vertex_barcode.value(i);

        if !prod_vx.is_null(i) && this_vertex_barcode == 0 {
            let placeholder = -(1000 + this_barcode);
            current
                .prod_vertex
                .entry(placeholder)
                .or_insert((prod_vx.value(i), prod_vy.value(i), prod_vz.value(i), prod_vt.value(i)));
        }
        if !end_vx.is_null(i) && this_end_vertex_barcode == 0 {
            let placeholder = -(2000 + this_barcode);
            current
                .end_vertex
                .entry(placeholder)
                .or_insert((end_vx.value(i), end_vy.value(i), end_vz.value(i), end_vt.value(i)));
        }

        current.particles.push(Particle {
            pdg_id: pdg_id.value(i),
            status: status.value(i),
            px: px.value(i),
            py: py.value(i),
            pz: pz.value(i),
            energy: energy.value(i),
            mass: mass.value(i),
            mother1: mother1.value(i),
            mother2: mother2.value(i),
            color1: color1.value(i),
            color2: color2.value(i),
            spin: spin.value(i),
            barcode: this_barcode,
            vertex_barcode: if this_vertex_barcode != 0 {
                this_vertex_barcode
            } else if !prod_vx.is_null(i) {
                -(1000 + this_barcode)
            } else {
                0
            },
            end_vertex_barcode: if this_end_vertex_barcode != 0 {
                this_end_vertex_barcode
            } else if !end_vx.is_null(i) {
                -(2000 + this_barcode)
            } else {
                0
            },
            attributes: parse_extra(opt_string(attributes_json, i)),
        });
    }

    Ok(())
}

fn decode_particle_struct(arr: &StructArray) -> Vec<Particle> {
    let pdg_id = arr.column_by_name("pdg_id").unwrap().as_primitive::<Int32Type>();
    let status = arr.column_by_name("status").unwrap().as_primitive::<Int32Type>();
    let mother1 = arr.column_by_name("mother1").unwrap().as_primitive::<Int32Type>();
    let mother2 = arr.column_by_name("mother2").unwrap().as_primitive::<Int32Type>();
    let color1 = arr.column_by_name("color1").unwrap().as_primitive::<Int32Type>();
    let color2 = arr.column_by_name("color2").unwrap().as_primitive::<Int32Type>();
    let px = arr.column_by_name("px").unwrap().as_primitive::<Float64Type>();
    let py = arr.column_by_name("py").unwrap().as_primitive::<Float64Type>();
    let pz = arr.column_by_name("pz").unwrap().as_primitive::<Float64Type>();
    let energy = arr.column_by_name("energy").unwrap().as_primitive::<Float64Type>();
    let mass = arr.column_by_name("mass").unwrap().as_primitive::<Float64Type>();
    let spin = arr.column_by_name("spin").unwrap().as_primitive::<Float64Type>();
    let barcode = arr.column_by_name("barcode").unwrap().as_primitive::<Int32Type>();
    let vertex_barcode = arr.column_by_name("vertex_barcode").unwrap().as_primitive::<Int32Type>();
    let end_vertex_barcode = arr.column_by_name("end_vertex_barcode").unwrap().as_primitive::<Int32Type>();
    let attributes_json = arr.column_by_name("attributes_json").unwrap().as_string::<i32>();

    (0..arr.len())
        .map(|i| Particle {
            pdg_id: pdg_id.value(i),
            status: status.value(i),
            px: px.value(i),
            py: py.value(i),
            pz: pz.value(i),
            energy: energy.value(i),
            mass: mass.value(i),
            mother1: mother1.value(i),
            mother2: mother2.value(i),
            color1: color1.value(i),
            color2: color2.value(i),
            spin: spin.value(i),
            barcode: barcode.value(i),
            vertex_barcode: vertex_barcode.value(i),
            end_vertex_barcode: end_vertex_barcode.value(i),
            attributes: parse_extra(opt_string(attributes_json, i)),
        })
        .collect()
}

fn decode_vertex_struct(arr: &StructArray) -> Vec<Vertex> {
    let barcode = arr.column_by_name("barcode").unwrap().as_primitive::<Int32Type>();
    let x = arr.column_by_name("x").unwrap().as_primitive::<Float64Type>();
    let y = arr.column_by_name("y").unwrap().as_primitive::<Float64Type>();
    let z = arr.column_by_name("z").unwrap().as_primitive::<Float64Type>();
    let t = arr.column_by_name("t").unwrap().as_primitive::<Float64Type>();
    let incoming = arr.column_by_name("incoming").unwrap().as_list::<i32>();
    let outgoing = arr.column_by_name("outgoing").unwrap().as_list::<i32>();

    (0..arr.len())
        .map(|i| Vertex {
            barcode: barcode.value(i),
            x: x.value(i),
            y: y.value(i),
            z: z.value(i),
            t: t.value(i),
            incoming: incoming.value(i).as_primitive::<Int32Type>().values().to_vec(),
            outgoing: outgoing.value(i).as_primitive::<Int32Type>().values().to_vec(),
        })
        .collect()
}

fn decode_columnar_batch(
    batch: &RecordBatch,
    out: &mut std::collections::VecDeque<Event>,
) -> Result<(), FormatError> {
    let event_number = batch.column_by_name("event_number").unwrap().as_primitive::<Int64Type>();
    let process_id = batch.column_by_name("process_id").unwrap().as_primitive::<Int32Type>();
    let scale = batch.column_by_name("scale").unwrap().as_primitive::<Float64Type>();
    let alpha_qed = batch.column_by_name("alpha_qed").unwrap().as_primitive::<Float64Type>();
    let alpha_qcd = batch.column_by_name("alpha_qcd").unwrap().as_primitive::<Float64Type>();
    let weights = batch.column_by_name("weights").unwrap().as_list::<i32>();
    let event_extra_json = batch.column_by_name("event_extra_json").unwrap().as_string::<i32>();
    let particles = batch.column_by_name("particles").unwrap().as_list::<i32>();
    let vertices = batch.column_by_name("vertices").unwrap().as_list::<i32>();

    for i in 0..batch.num_rows() {
        let particle_rows = decode_particle_struct(particles.value(i).as_struct());
        let vertex_rows = decode_vertex_struct(vertices.value(i).as_struct());

        let mut event = Event {
            event_number: event_number.value(i),
            particles: particle_rows,
            vertices: vertex_rows,
            weights: weights.value(i).as_primitive::<Float64Type>().values().to_vec(),
            process_id: process_id.value(i),
            scale: scale.value(i),
            alpha_qed: alpha_qed.value(i),
            alpha_qcd: alpha_qcd.value(i),
            n_particles: 0,
            extra: parse_extra(opt_string(event_extra_json, i)),
        };
        event.n_particles = event.particles.len() as i32;
        if event.vertices.is_empty() {
            vertex::reconstruct(&mut event);
        }
        out.push_back(event);
    }

    Ok(())
}
