use std::sync::Arc;

use arrow_array::builder::{Float64Builder, Int32Builder, Int64Builder, ListBuilder, StringBuilder};
use arrow_array::{ArrayRef, Int32Array, Int64Array, Float64Array, ListArray, RecordBatch, StringArray, StructArray};
use arrow_buffer::OffsetBuffer;
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;

use crate::event::{Event, Particle, RunInfo, Vertex};
use crate::file::File;
use crate::formats::{FormatError, WriterOptions};
use crate::traits::EventSink;
use crate::vertex;

use super::schema::{self, columnar_schema, flat_schema, particle_struct_fields, vertex_struct_fields};

/// Each `write_event` call appends one small [`RecordBatch`] (one row per
/// particle for the flat layout, one row for the columnar layout) to an
/// already-open [`ArrowWriter`], keeping memory bounded to O(1 event) the
/// way every other writer in this crate does (§5); `finish` closes the
/// file, writing the footer with the `hepconduit.*` metadata attached at
/// creation time.
pub struct ParquetWriter {
    out: ArrowWriter<File>,
    columnar: bool,
    schema: Arc<Schema>,
}

impl ParquetWriter {
    pub fn create(sink: File, run_info: RunInfo, options: WriterOptions) -> Result<Self, FormatError> {
        let schema = Arc::new(if options.columnar { columnar_schema() } else { flat_schema() });

        let mut md = schema::encode_run_info(&run_info);
        md.insert(
            "hepconduit_schema".to_string(),
            if options.columnar { super::SCHEMA_COLUMNAR } else { super::SCHEMA_FLAT }.to_string(),
        );
        for (k, v) in &options.extra_metadata {
            md.insert(k.clone(), v.clone());
        }
        let key_value_metadata: Vec<KeyValue> =
            md.into_iter().map(|(k, v)| KeyValue::new(k, Some(v))).collect();

        let props = WriterProperties::builder()
            .set_key_value_metadata(Some(key_value_metadata))
            .build();
        let out = ArrowWriter::try_new(sink, Arc::clone(&schema), Some(props))
            .map_err(|e| framing(e.to_string()))?;

        Ok(ParquetWriter {
            out,
            columnar: options.columnar,
            schema,
        })
    }
}

fn framing(detail: String) -> FormatError {
    FormatError::Framing { format: "parquet", detail }
}

fn float_list_array(rows: &[Vec<f64>]) -> ListArray {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        for v in row {
            builder.values().append_value(*v);
        }
        builder.append(true);
    }
    builder.finish()
}

fn particle_struct_array(particles: &[Particle]) -> StructArray {
    let mut pdg_id = Int32Builder::new();
    let mut status = Int32Builder::new();
    let mut mother1 = Int32Builder::new();
    let mut mother2 = Int32Builder::new();
    let mut color1 = Int32Builder::new();
    let mut color2 = Int32Builder::new();
    let mut px = Float64Builder::new();
    let mut py = Float64Builder::new();
    let mut pz = Float64Builder::new();
    let mut energy = Float64Builder::new();
    let mut mass = Float64Builder::new();
    let mut spin = Float64Builder::new();
    let mut barcode = Int32Builder::new();
    let mut vertex_barcode = Int32Builder::new();
    let mut end_vertex_barcode = Int32Builder::new();
    let mut attributes_json = StringBuilder::new();

    for p in particles {
        pdg_id.append_value(p.pdg_id);
        status.append_value(p.status);
        mother1.append_value(p.mother1);
        mother2.append_value(p.mother2);
        color1.append_value(p.color1);
        color2.append_value(p.color2);
        px.append_value(p.px);
        py.append_value(p.py);
        pz.append_value(p.pz);
        energy.append_value(p.energy);
        mass.append_value(p.mass);
        spin.append_value(p.spin);
        barcode.append_value(p.barcode);
        vertex_barcode.append_value(p.vertex_barcode);
        end_vertex_barcode.append_value(p.end_vertex_barcode);
        if p.attributes.is_empty() {
            attributes_json.append_null();
        } else {
            attributes_json.append_value(p.attributes.to_canonical_json().unwrap_or_default());
        }
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(pdg_id.finish()),
        Arc::new(status.finish()),
        Arc::new(mother1.finish()),
        Arc::new(mother2.finish()),
        Arc::new(color1.finish()),
        Arc::new(color2.finish()),
        Arc::new(px.finish()),
        Arc::new(py.finish()),
        Arc::new(pz.finish()),
        Arc::new(energy.finish()),
        Arc::new(mass.finish()),
        Arc::new(spin.finish()),
        Arc::new(barcode.finish()),
        Arc::new(vertex_barcode.finish()),
        Arc::new(end_vertex_barcode.finish()),
        Arc::new(attributes_json.finish()),
    ];
    StructArray::new(particle_struct_fields(), columns, None)
}

fn int32_list_array(rows: &[Vec<i32>]) -> ListArray {
    let mut builder = ListBuilder::new(Int32Builder::new());
    for row in rows {
        for v in row {
            builder.values().append_value(*v);
        }
        builder.append(true);
    }
    builder.finish()
}

fn vertex_struct_array(vertices: &[Vertex]) -> StructArray {
    let barcode: Int32Array = vertices.iter().map(|v| v.barcode).collect();
    let x: Float64Array = vertices.iter().map(|v| v.x).collect();
    let y: Float64Array = vertices.iter().map(|v| v.y).collect();
    let z: Float64Array = vertices.iter().map(|v| v.z).collect();
    let t: Float64Array = vertices.iter().map(|v| v.t).collect();
    let incoming = int32_list_array(&vertices.iter().map(|v| v.incoming.clone()).collect::<Vec<_>>());
    let outgoing = int32_list_array(&vertices.iter().map(|v| v.outgoing.clone()).collect::<Vec<_>>());

    let columns: Vec<ArrayRef> = vec![
        Arc::new(barcode),
        Arc::new(x),
        Arc::new(y),
        Arc::new(z),
        Arc::new(t),
        Arc::new(incoming),
        Arc::new(outgoing),
    ];
    StructArray::new(vertex_struct_fields(), columns, None)
}

fn list_of_struct(values: StructArray, row_lens: &[usize]) -> ListArray {
    let mut offsets = Vec::with_capacity(row_lens.len() + 1);
    offsets.push(0i32);
    let mut acc = 0i32;
    for len in row_lens {
        acc += *len as i32;
        offsets.push(acc);
    }
    let field = Arc::new(Field::new("item", DataType::Struct(values.fields().clone()), true));
    ListArray::new(field, OffsetBuffer::new(offsets.into()), Arc::new(values) as ArrayRef, None)
}

impl EventSink for ParquetWriter {
    fn write_event(&mut self, event: &Event) -> Result<(), FormatError> {
        let mut event = event.clone();
        vertex::reconstruct(&mut event);

        let batch = if self.columnar {
            let event_number = Int64Array::from(vec![event.event_number]);
            let process_id = Int32Array::from(vec![event.process_id]);
            let scale = Float64Array::from(vec![event.scale]);
            let alpha_qed = Float64Array::from(vec![event.alpha_qed]);
            let alpha_qcd = Float64Array::from(vec![event.alpha_qcd]);
            let weights = float_list_array(&[event.weights.clone()]);
            let event_extra_json = StringArray::from(vec![if event.extra.is_empty() {
                None
            } else {
                Some(event.extra.to_canonical_json().unwrap_or_default())
            }]);
            let particles = list_of_struct(particle_struct_array(&event.particles), &[event.particles.len()]);
            let vertices = list_of_struct(vertex_struct_array(&event.vertices), &[event.vertices.len()]);

            RecordBatch::try_new(
                Arc::clone(&self.schema),
                vec![
                    Arc::new(event_number),
                    Arc::new(process_id),
                    Arc::new(scale),
                    Arc::new(alpha_qed),
                    Arc::new(alpha_qcd),
                    Arc::new(weights),
                    Arc::new(event_extra_json),
                    Arc::new(particles),
                    Arc::new(vertices),
                ],
            )
        } else {
            let n = event.particles.len();
            let vtx_by_barcode = |bc: i32| -> Option<&Vertex> {
                if bc == 0 {
                    None
                } else {
                    event.vertices.iter().find(|v| v.barcode == bc)
                }
            };

            let event_number = Int64Array::from(vec![event.event_number; n]);
            let process_id = Int32Array::from(vec![event.process_id; n]);
            let scale = Float64Array::from(vec![event.scale; n]);
            let alpha_qed = Float64Array::from(vec![event.alpha_qed; n]);
            let alpha_qcd = Float64Array::from(vec![event.alpha_qcd; n]);
            let weights = float_list_array(&vec![event.weights.clone(); n]);
            let event_extra_json = StringArray::from(vec![
                if event.extra.is_empty() { None } else { Some(event.extra.to_canonical_json().unwrap_or_default()) };
                n
            ]);

            let mut pdg_id = Int32Builder::new();
            let mut status = Int32Builder::new();
            let mut mother1 = Int32Builder::new();
            let mut mother2 = Int32Builder::new();
            let mut color1 = Int32Builder::new();
            let mut color2 = Int32Builder::new();
            let mut px = Float64Builder::new();
            let mut py = Float64Builder::new();
            let mut pz = Float64Builder::new();
            let mut energy = Float64Builder::new();
            let mut mass = Float64Builder::new();
            let mut spin = Float64Builder::new();
            let mut barcode = Int32Builder::new();
            let mut vertex_barcode = Int32Builder::new();
            let mut end_vertex_barcode = Int32Builder::new();
            let mut attributes_json = StringBuilder::new();
            let mut prod_vx = Float64Builder::new();
            let mut prod_vy = Float64Builder::new();
            let mut prod_vz = Float64Builder::new();
            let mut prod_vt = Float64Builder::new();
            let mut end_vx = Float64Builder::new();
            let mut end_vy = Float64Builder::new();
            let mut end_vz = Float64Builder::new();
            let mut end_vt = Float64Builder::new();

            for p in &event.particles {
                pdg_id.append_value(p.pdg_id);
                status.append_value(p.status);
                mother1.append_value(p.mother1);
                mother2.append_value(p.mother2);
                color1.append_value(p.color1);
                color2.append_value(p.color2);
                px.append_value(p.px);
                py.append_value(p.py);
                pz.append_value(p.pz);
                energy.append_value(p.energy);
                mass.append_value(p.mass);
                spin.append_value(p.spin);
                barcode.append_value(p.barcode);
                vertex_barcode.append_value(p.vertex_barcode);
                end_vertex_barcode.append_value(p.end_vertex_barcode);
                if p.attributes.is_empty() {
                    attributes_json.append_null();
                } else {
                    attributes_json.append_value(p.attributes.to_canonical_json().unwrap_or_default());
                }

                let prod = vtx_by_barcode(p.vertex_barcode);
                let end = vtx_by_barcode(p.end_vertex_barcode);
                prod_vx.append_value(prod.map(|v| v.x).unwrap_or(0.0));
                prod_vy.append_value(prod.map(|v| v.y).unwrap_or(0.0));
                prod_vz.append_value(prod.map(|v| v.z).unwrap_or(0.0));
                prod_vt.append_value(prod.map(|v| v.t).unwrap_or(0.0));
                end_vx.append_value(end.map(|v| v.x).unwrap_or(0.0));
                end_vy.append_value(end.map(|v| v.y).unwrap_or(0.0));
                end_vz.append_value(end.map(|v| v.z).unwrap_or(0.0));
                end_vt.append_value(end.map(|v| v.t).unwrap_or(0.0));
            }

            RecordBatch::try_new(
                Arc::clone(&self.schema),
                vec![
                    Arc::new(event_number),
                    Arc::new(process_id),
                    Arc::new(scale),
                    Arc::new(alpha_qed),
                    Arc::new(alpha_qcd),
                    Arc::new(weights),
                    Arc::new(event_extra_json),
                    Arc::new(pdg_id.finish()),
                    Arc::new(status.finish()),
                    Arc::new(mother1.finish()),
                    Arc::new(mother2.finish()),
                    Arc::new(color1.finish()),
                    Arc::new(color2.finish()),
                    Arc::new(px.finish()),
                    Arc::new(py.finish()),
                    Arc::new(pz.finish()),
                    Arc::new(energy.finish()),
                    Arc::new(mass.finish()),
                    Arc::new(spin.finish()),
                    Arc::new(barcode.finish()),
                    Arc::new(vertex_barcode.finish()),
                    Arc::new(end_vertex_barcode.finish()),
                    Arc::new(attributes_json.finish()),
                    Arc::new(prod_vx.finish()),
                    Arc::new(prod_vy.finish()),
                    Arc::new(prod_vz.finish()),
                    Arc::new(prod_vt.finish()),
                    Arc::new(end_vx.finish()),
                    Arc::new(end_vy.finish()),
                    Arc::new(end_vz.finish()),
                    Arc::new(end_vt.finish()),
                ],
            )
        };

        let batch = batch.map_err(|e| framing(e.to_string()))?;
        self.out.write(&batch).map_err(|e| framing(e.to_string()))
    }

    fn finish(mut self: Box<Self>) -> Result<(), FormatError> {
        self.out.close().map_err(|e| framing(e.to_string()))?;
        Ok(())
    }
}
