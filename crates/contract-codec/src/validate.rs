use crate::{parse_speaker, ContractError, FactCheckContract, OutlineContract, ResponseType, SegmentContract};

const MIN_SEGMENTS: usize = 3;
const MAX_SEGMENTS: usize = 12;

pub fn outline(contract: &OutlineContract) -> Result<(), ContractError> {
    let invalid = |reason: String| ContractError::Invalid {
        response_type: ResponseType::Outline,
        reason,
    };

    if contract.segments.len() < MIN_SEGMENTS || contract.segments.len() > MAX_SEGMENTS {
        return Err(invalid(format!(
            "expected {MIN_SEGMENTS}-{MAX_SEGMENTS} segments, got {}",
            contract.segments.len()
        )));
    }
    for segment in &contract.segments {
        if segment.duration_target_s == 0 {
            return Err(invalid(format!(
                "segment {:?} has non-positive duration_target_s",
                segment.title
            )));
        }
    }
    Ok(())
}

pub fn segment(contract: &SegmentContract) -> Result<(), ContractError> {
    let invalid = |reason: String| ContractError::Invalid {
        response_type: ResponseType::Segment,
        reason,
    };

    if contract.script.is_empty() {
        return Err(invalid("script is empty".to_string()));
    }
    for line in &contract.script {
        if parse_speaker(&line.speaker).is_none() {
            return Err(invalid(format!("unknown speaker {:?}", line.speaker)));
        }
        if line.text.trim().is_empty() {
            return Err(invalid("line text is empty".to_string()));
        }
    }
    Ok(())
}

pub fn factcheck(contract: &FactCheckContract) -> Result<(), ContractError> {
    let invalid = |reason: String| ContractError::Invalid {
        response_type: ResponseType::FactCheck,
        reason,
    };

    if !(0.0..=1.0).contains(&contract.accuracy) {
        return Err(invalid(format!(
            "accuracy {} out of [0,1]",
            contract.accuracy
        )));
    }
    Ok(())
}
