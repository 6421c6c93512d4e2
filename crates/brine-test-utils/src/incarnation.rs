//! A toy incarnation with a one-line textual syntax per piece.
//!
//! ```text
//! node         "A=10, B=2"          initial concentrations
//! distribution "", "2.5", "dirac:1" trigger, exponential, Dirac comb
//! reaction     "A + B -> C"         mass action on the local node
//! condition    "true", "A >= 3"
//! action       "A += -1", "transfer A"
//! ```

use std::collections::BTreeMap;

use brine_core::{ConstructionError, NodeId, Position};
use brine_reaction::{
    construction_error, Action, Condition, Distribution, Incarnation, Reaction, SimRng,
};
use brine_space::Environment;

use crate::fixtures::{AlwaysTrue, ChangeConcentration, MoleculeAtLeast, TransferToNeighbor};

fn invalid(parameter: &str, reason: impl Into<String>) -> ConstructionError {
    ConstructionError::InvalidParameter {
        parameter: parameter.to_owned(),
        reason: reason.into(),
    }
}

fn check_node(env: &Environment<f64>, node: NodeId) -> Result<(), ConstructionError> {
    if env.contains_node(node) {
        Ok(())
    } else {
        Err(ConstructionError::UnknownNode { node })
    }
}

/// Stoichiometry of one side of `lhs -> rhs`.
fn side(text: &str, parameter: &str) -> Result<BTreeMap<String, f64>, ConstructionError> {
    let mut counts = BTreeMap::new();
    for token in text.split('+').map(str::trim).filter(|t| !t.is_empty()) {
        if !token.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(invalid(parameter, format!("bad molecule name '{token}'")));
        }
        *counts.entry(token.to_owned()).or_insert(0.0) += 1.0;
    }
    Ok(counts)
}

/// Mass-action chemistry on `f64` concentrations.
#[derive(Clone, Copy, Debug, Default)]
pub struct ToyIncarnation;

impl Incarnation<f64> for ToyIncarnation {
    fn name(&self) -> &str {
        "toy"
    }

    fn create_node(
        &self,
        env: &mut Environment<f64>,
        position: Position,
        parameter: Option<&str>,
    ) -> Result<NodeId, ConstructionError> {
        let mut initial = Vec::new();
        for pair in parameter
            .unwrap_or("")
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
        {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid(pair, "expected <molecule>=<value>"))?;
            initial.push((name.trim().to_owned(), self.create_concentration(Some(value))?));
        }
        let id = env.add_node(position).map_err(construction_error)?;
        for (name, value) in initial {
            env.set_concentration(id, name.as_str().into(), value)
                .map_err(construction_error)?;
        }
        Ok(id)
    }

    fn create_reaction(
        &self,
        _rng: &mut SimRng,
        env: &Environment<f64>,
        node: NodeId,
        distribution: Distribution<f64>,
        parameter: Option<&str>,
    ) -> Result<Reaction<f64>, ConstructionError> {
        check_node(env, node)?;
        let text = parameter.unwrap_or("").trim();
        let mut reaction = Reaction::new(node, distribution);
        if text.is_empty() {
            return Ok(reaction);
        }
        let (lhs, rhs) = text
            .split_once("->")
            .ok_or_else(|| invalid(text, "expected '<reactants> -> <products>'"))?;
        let reactants = side(lhs, text)?;
        let products = side(rhs, text)?;

        let mut conditions: Vec<Box<dyn Condition<f64>>> = Vec::new();
        let mut actions: Vec<Box<dyn Action<f64>>> = Vec::new();
        let mut net: BTreeMap<&str, f64> = BTreeMap::new();
        for (name, count) in &reactants {
            conditions.push(Box::new(MoleculeAtLeast::new(node, name.as_str(), *count)));
            *net.entry(name.as_str()).or_insert(0.0) -= count;
        }
        for (name, count) in &products {
            *net.entry(name.as_str()).or_insert(0.0) += count;
        }
        for (name, delta) in net {
            if delta != 0.0 {
                actions.push(Box::new(ChangeConcentration::new(node, name, delta)));
            }
        }
        reaction.set_conditions(conditions);
        reaction.set_actions(actions);
        Ok(reaction)
    }

    fn create_condition(
        &self,
        _rng: &mut SimRng,
        env: &Environment<f64>,
        node: NodeId,
        parameter: Option<&str>,
    ) -> Result<Box<dyn Condition<f64>>, ConstructionError> {
        check_node(env, node)?;
        let text = parameter.unwrap_or("").trim();
        if text == "true" {
            return Ok(Box::new(AlwaysTrue { node }));
        }
        let (name, threshold) = text
            .split_once(">=")
            .ok_or_else(|| invalid(text, "expected 'true' or '<molecule> >= <value>'"))?;
        let threshold = self.create_concentration(Some(threshold))?;
        Ok(Box::new(MoleculeAtLeast::new(node, name.trim(), threshold)))
    }

    fn create_action(
        &self,
        _rng: &mut SimRng,
        env: &Environment<f64>,
        node: NodeId,
        parameter: Option<&str>,
    ) -> Result<Box<dyn Action<f64>>, ConstructionError> {
        check_node(env, node)?;
        let text = parameter.unwrap_or("").trim();
        if let Some(name) = text.strip_prefix("transfer ") {
            return Ok(Box::new(TransferToNeighbor::new(node, name.trim())));
        }
        if text.starts_with("send ") {
            return Err(ConstructionError::UnsupportedCapability {
                reason: format!("'{text}' needs a network layer"),
            });
        }
        let (name, delta) = text.split_once("+=").ok_or_else(|| {
            invalid(text, "expected '<molecule> += <delta>' or 'transfer <molecule>'")
        })?;
        let delta = self.create_concentration(Some(delta))?;
        Ok(Box::new(ChangeConcentration::new(node, name.trim(), delta)))
    }

    fn create_concentration(&self, text: Option<&str>) -> Result<f64, ConstructionError> {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(0.0);
        };
        let value: f64 = text.parse().map_err(|_| invalid(text, "not a number"))?;
        if !value.is_finite() {
            return Err(invalid(text, "must be finite"));
        }
        Ok(value)
    }
}
