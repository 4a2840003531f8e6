//! WorkerPool 单元测试
//!
//! 测试任务池的配置、任务状态、队列排序和调度行为
