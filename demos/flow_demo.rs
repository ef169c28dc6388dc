//! 流转引擎演示程序
//!
//! 展示流转引擎的核心功能，包括排队受理、叫号就诊、
//! 计时超时提醒、应急预案与血液调配板

use chrono::Utc;
use clinic_core::{AdmitRequest, BloodGroup};
use clinic_flow::FlowEngine;
use clinic_storage::{MemorySnapshotStore, SnapshotStore};

fn admit(patient: &str, doctor: &str, wait_minutes: i64) -> AdmitRequest {
    AdmitRequest {
        patient_name: patient.to_string(),
        assigned_doctor: doctor.to_string(),
        scheduled_time: Utc::now(),
        estimated_wait_minutes: wait_minutes,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    // 创建流转引擎
    let mut engine = FlowEngine::new();

    println!("🏥 门诊流转引擎演示\n");

    // 1. 配置医生预期问诊时长
    engine.set_expected_duration("陈医生", 900);
    engine.set_expected_duration("周医生", 600);
    println!("✅ 医生预期时长配置完成");

    // 2. 受理三位患者
    let t1 = engine.admit_token(admit("王芳", "陈医生", 10))?;
    let t2 = engine.admit_token(admit("李强", "周医生", 20))?;
    let t3 = engine.admit_token(admit("赵敏", "陈医生", 30))?;
    println!("✅ 受理了 {} 位患者", engine.pending_tokens().len());
    for token in engine.pending_tokens() {
        println!(
            "   - {} {} → {}",
            token.label(),
            token.patient_name,
            token.assigned_doctor
        );
    }

    // 3. 叫号就诊
    println!("\n📋 叫号: {} {}", t1.label(), t1.patient_name);
    engine.approve_token(t1.id)?;
    println!("📋 叫号: {} {}", t2.label(), t2.patient_name);
    engine.approve_token(t2.id)?;

    // 4. 模拟 905 秒的计时推进
    for _ in 0..905 {
        engine.tick();
    }
    println!("\n⏱️  905 秒后的会话进度:");
    for progress in engine.session_progress() {
        println!(
            "   - {} {} 医生 {}: {}s/{}s ({}%) 超时={} 显著超时={}",
            clinic_core::utils::format_token_label(progress.token_number),
            progress.patient_name,
            progress.doctor_name,
            progress.elapsed_seconds,
            progress.expected_seconds,
            progress.progress_percent,
            progress.is_overdue,
            progress.is_extended
        );
    }

    // 5. 完成与转急诊
    let record = engine.finalize_session(t1.id, 905, Some("复诊两周后".to_string()))?;
    println!("\n✅ {} 就诊完成，审计记录 {}", record.patient_name, record.id);

    engine.escalate_session(t2.id)?;
    println!("🚨 李强 转急诊处理（不计入完成台账）");

    // 6. 应急预案演练
    println!("\n🚨 启动应急预案");
    engine.activate_override("值班主任");
    match engine.admit_token(admit("孙伟", "陈医生", 10)) {
        Err(e) => println!("   新接诊被拒: {}", e),
        Ok(_) => unreachable!(),
    }
    match engine.approve_token(t3.id) {
        Err(e) => println!("   叫号被拒: {}", e),
        Ok(_) => unreachable!(),
    }
    engine.deactivate_override();
    println!("   解除预案，恢复接诊");

    // 7. 血液调配板
    println!("\n🩸 血液调配演示:");
    let request = engine.post_blood_direct(BloodGroup::ONeg, 2, "本院", "市二医院")?;
    println!("   定向请求 {} x{} → 市二医院", request.blood_group, request.units);

    engine.decline_blood(request.id, "市二医院")?;
    println!("   市二医院婉拒，请求转入社区广播");

    engine.acknowledge_blood(request.id, "社区血站")?;
    engine.fulfill_blood(request.id, "社区血站")?;
    println!("   社区血站应答并完成调配");

    // 8. 系统概览
    let overview = engine.overview();
    println!("\n📊 系统概览:");
    println!("   候诊: {}", overview.waiting_count);
    println!("   在诊: {}", overview.active_count);
    println!("   已完成: {}", overview.completed_count);
    println!("   转急诊: {}", overview.escalated_count);
    println!("   应急预案: {}", overview.override_active);

    // 9. 快照落盘演示
    let store = MemorySnapshotStore::new();
    store.save(&engine.snapshot()).await?;
    let restored = store.load().await?.expect("snapshot was just saved");
    println!(
        "\n💾 快照保存并回读成功: {} 条候诊, {} 条审计",
        restored.waiting.len(),
        restored.audit.len()
    );

    println!("\n🎉 流转引擎演示完成!");
    Ok(())
}
