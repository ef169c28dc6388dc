//! 血液调配板
//!
//! 双通道请求/应答：医院间定向握手与社区广播。
//! 定向请求仅目标机构可应答；被婉拒后自动转入广播通道，
//! 由任意机构接手。

use chrono::Utc;
use clinic_core::{
    BloodGroup, BloodRequest, BloodRequestChannel, BloodRequestStatus, ClinicError, Result,
};
use uuid::Uuid;

/// 血液调配板
#[derive(Debug, Default)]
pub struct BloodRequestBoard {
    requests: Vec<BloodRequest>,
}

impl BloodRequestBoard {
    /// 创建空调配板
    pub fn new() -> Self {
        Self::default()
    }

    /// 发起医院间定向请求
    pub fn post_direct(
        &mut self,
        blood_group: BloodGroup,
        units: u32,
        requested_by: &str,
        facility: &str,
    ) -> Result<BloodRequest> {
        if requested_by == facility {
            return Err(ClinicError::Validation(
                "facility cannot request blood from itself".to_string(),
            ));
        }
        self.post(
            blood_group,
            units,
            requested_by,
            BloodRequestChannel::Direct {
                facility: facility.to_string(),
            },
        )
    }

    /// 发起社区广播请求
    pub fn post_broadcast(
        &mut self,
        blood_group: BloodGroup,
        units: u32,
        requested_by: &str,
    ) -> Result<BloodRequest> {
        self.post(blood_group, units, requested_by, BloodRequestChannel::Broadcast)
    }

    fn post(
        &mut self,
        blood_group: BloodGroup,
        units: u32,
        requested_by: &str,
        channel: BloodRequestChannel,
    ) -> Result<BloodRequest> {
        if units == 0 {
            return Err(ClinicError::Validation("units must be positive".to_string()));
        }
        if requested_by.trim().is_empty() {
            return Err(ClinicError::Validation(
                "requesting facility is empty".to_string(),
            ));
        }

        let request = BloodRequest {
            id: Uuid::new_v4(),
            blood_group,
            units,
            requested_by: requested_by.to_string(),
            channel,
            status: BloodRequestStatus::Pending,
            created_at: Utc::now(),
            responded_by: None,
            responded_at: None,
        };
        self.requests.push(request.clone());

        tracing::info!(
            "Blood request {} posted: {} x{} by {} via {:?}",
            request.id,
            request.blood_group,
            request.units,
            request.requested_by,
            request.channel
        );
        Ok(request)
    }

    /// 应答请求
    ///
    /// 定向请求仅目标机构可应答；广播请求任何机构
    /// （发起方除外）均可应答。
    pub fn acknowledge(&mut self, request_id: Uuid, facility: &str) -> Result<BloodRequest> {
        let request = self.find_mut(request_id)?;

        if request.status != BloodRequestStatus::Pending {
            return Err(ClinicError::InvalidState(format!(
                "Request {} is not pending",
                request_id
            )));
        }
        match &request.channel {
            BloodRequestChannel::Direct { facility: target } if target != facility => {
                return Err(ClinicError::Validation(format!(
                    "Request {} is addressed to {}",
                    request_id, target
                )));
            }
            BloodRequestChannel::Broadcast if request.requested_by == facility => {
                return Err(ClinicError::Validation(
                    "requesting facility cannot acknowledge its own broadcast".to_string(),
                ));
            }
            _ => {}
        }

        request.status = BloodRequestStatus::Acknowledged;
        request.responded_by = Some(facility.to_string());
        request.responded_at = Some(Utc::now());

        tracing::info!("Blood request {} acknowledged by {}", request_id, facility);
        Ok(request.clone())
    }

    /// 婉拒定向请求：请求转入广播通道继续等待应答
    pub fn decline(&mut self, request_id: Uuid, facility: &str) -> Result<BloodRequest> {
        let request = self.find_mut(request_id)?;

        if request.status != BloodRequestStatus::Pending {
            return Err(ClinicError::InvalidState(format!(
                "Request {} is not pending",
                request_id
            )));
        }
        match &request.channel {
            BloodRequestChannel::Direct { facility: target } => {
                if target != facility {
                    return Err(ClinicError::Validation(format!(
                        "Request {} is addressed to {}",
                        request_id, target
                    )));
                }
            }
            BloodRequestChannel::Broadcast => {
                return Err(ClinicError::InvalidState(
                    "broadcast requests cannot be declined".to_string(),
                ));
            }
        }

        request.channel = BloodRequestChannel::Broadcast;

        tracing::warn!(
            "Blood request {} declined by {}, falling back to broadcast",
            request_id,
            facility
        );
        Ok(request.clone())
    }

    /// 完成调配：仅已应答的请求可完成，且须由应答机构操作
    pub fn fulfill(&mut self, request_id: Uuid, facility: &str) -> Result<BloodRequest> {
        let request = self.find_mut(request_id)?;

        if request.status != BloodRequestStatus::Acknowledged {
            return Err(ClinicError::InvalidState(format!(
                "Request {} has not been acknowledged",
                request_id
            )));
        }
        if request.responded_by.as_deref() != Some(facility) {
            return Err(ClinicError::Validation(format!(
                "Request {} was acknowledged by another facility",
                request_id
            )));
        }

        request.status = BloodRequestStatus::Fulfilled;
        request.responded_at = Some(Utc::now());

        tracing::info!("Blood request {} fulfilled by {}", request_id, facility);
        Ok(request.clone())
    }

    fn find_mut(&mut self, request_id: Uuid) -> Result<&mut BloodRequest> {
        self.requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Blood request {} not found", request_id)))
    }

    /// 待应答请求快照
    pub fn pending(&self) -> Vec<BloodRequest> {
        self.requests
            .iter()
            .filter(|r| r.status == BloodRequestStatus::Pending)
            .cloned()
            .collect()
    }

    /// 某机构可见的待应答请求：发给它的定向请求加上他人的广播
    pub fn outstanding_for(&self, facility: &str) -> Vec<BloodRequest> {
        self.requests
            .iter()
            .filter(|r| r.status == BloodRequestStatus::Pending)
            .filter(|r| match &r.channel {
                BloodRequestChannel::Direct { facility: target } => target == facility,
                BloodRequestChannel::Broadcast => r.requested_by != facility,
            })
            .cloned()
            .collect()
    }

    /// 全部请求快照，最近优先
    pub fn history(&self) -> Vec<BloodRequest> {
        let mut requests = self.requests.clone();
        requests.reverse();
        requests
    }
}
