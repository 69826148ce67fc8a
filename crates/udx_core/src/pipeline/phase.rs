use std::fmt::Debug;

use tracing::debug;
use udx_error::{Result, UdxError};

use super::reader::PartitionReader;
use crate::arrays::field::PhaseSchema;
use crate::arrays::record::RowSink;

/// One phase of a multi-phase transform.
///
/// Configured once when the transform is planned. Creates a fresh processor
/// for every partition it runs on.
pub trait TransformPhase: Debug + Sync + Send {
    fn name(&self) -> &'static str;

    /// Prepass phases see all rows as a single partition in input order,
    /// ignoring partition and order annotations.
    fn is_prepass(&self) -> bool {
        false
    }

    /// Validate the input schema and return the schema this phase emits.
    fn output_schema(&self, input: &PhaseSchema) -> Result<PhaseSchema>;

    fn create_processor(&self) -> Box<dyn PhaseProcessor>;
}

pub trait PhaseProcessor: Debug {
    /// Process one partition.
    ///
    /// The reader is positioned on the first row. Processing stops early if
    /// the writer stops accepting rows.
    fn process_partition(
        &mut self,
        reader: &mut dyn PartitionReader,
        writer: &mut dyn RowSink,
    ) -> Result<()>;
}

/// An ordered list of phases, each consuming the output of the previous one.
#[derive(Debug)]
pub struct MultiPhaseTransform {
    name: &'static str,
    phases: Vec<Box<dyn TransformPhase>>,
}

impl MultiPhaseTransform {
    pub fn new(name: &'static str, phases: Vec<Box<dyn TransformPhase>>) -> Self {
        MultiPhaseTransform { name, phases }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Plan the transform against its input schema.
    ///
    /// Every phase validates the output of the phase before it, so a shape
    /// mismatch anywhere in the chain fails here before any row flows.
    pub fn plan(self, input: &PhaseSchema) -> Result<PlannedTransform> {
        if self.phases.is_empty() {
            return Err(UdxError::schema("Transform has no phases").with_field("transform", self.name));
        }

        let mut planned = Vec::with_capacity(self.phases.len());
        let mut current = input.clone();

        for phase in self.phases {
            let output = phase.output_schema(&current).map_err(|e| {
                UdxError::with_kind(e.kind(), "Failed to plan transform phase")
                    .with_field("transform", self.name)
                    .with_field("phase", phase.name())
                    .with_field("input", &current)
                    .with_source(e)
            })?;
            debug!(transform = self.name, phase = phase.name(), %output, "planned phase");

            planned.push(PlannedPhase {
                phase,
                input: current,
                output: output.clone(),
            });
            current = output;
        }

        Ok(PlannedTransform {
            name: self.name,
            phases: planned,
        })
    }
}

#[derive(Debug)]
pub struct PlannedPhase {
    pub phase: Box<dyn TransformPhase>,
    pub input: PhaseSchema,
    pub output: PhaseSchema,
}

/// A transform whose phase schemas have all been validated.
#[derive(Debug)]
pub struct PlannedTransform {
    name: &'static str,
    phases: Vec<PlannedPhase>,
}

impl PlannedTransform {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn phases(&self) -> &[PlannedPhase] {
        &self.phases
    }

    pub fn output_schema(&self) -> &PhaseSchema {
        &self.phases[self.phases.len() - 1].output
    }
}
